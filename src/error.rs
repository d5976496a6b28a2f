//! Error types for rusty-factors

use thiserror::Error;

/// Main error type for rusty-factors
#[derive(Error, Debug)]
pub enum FactorError {
    #[error("Empty input: {context}")]
    EmptyInput { context: String },

    #[error("Malformed bar at index {index}: {field} = {value}")]
    MalformedBar {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl FactorError {
    /// Shorthand for an empty-input failure
    pub fn empty(context: impl Into<String>) -> Self {
        FactorError::EmptyInput {
            context: context.into(),
        }
    }
}

/// Result type alias for rusty-factors operations
pub type Result<T> = std::result::Result<T, FactorError>;
