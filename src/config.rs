//! Engine configuration: window catalog and ranking exclusions
//!
//! Configuration is a plain value handed to each component; nothing here is
//! process-global, so several configurations can run side by side.

use crate::error::{FactorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lookback window in minutes (one bar per minute after normalization)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowSize(pub u32);

impl WindowSize {
    pub const fn minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Window length in bars
    pub fn bars(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unordered pair of distinct windows, `short < long`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowPair {
    pub short: WindowSize,
    pub long: WindowSize,
}

/// 5 minutes through 30 days
pub const DEFAULT_WINDOWS: [u32; 9] = [5, 10, 15, 30, 60, 4 * 60, 24 * 60, 7 * 24 * 60, 30 * 24 * 60];

/// Ordered, strictly increasing set of lookback windows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct WindowCatalog {
    windows: Vec<WindowSize>,
}

impl WindowCatalog {
    /// Build a catalog, rejecting empty, zero-length or unordered windows
    pub fn new(minutes: &[u32]) -> Result<Self> {
        if minutes.is_empty() {
            return Err(FactorError::ConfigError(
                "window catalog must not be empty".to_string(),
            ));
        }
        if minutes.contains(&0) {
            return Err(FactorError::ConfigError(
                "window size must be greater than 0".to_string(),
            ));
        }
        if minutes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FactorError::ConfigError(format!(
                "window sizes must be strictly increasing: {:?}",
                minutes
            )));
        }
        Ok(Self {
            windows: minutes.iter().copied().map(WindowSize).collect(),
        })
    }

    pub fn windows(&self) -> &[WindowSize] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Every unordered pair in catalog order: (w0,w1), (w0,w2), ..., (w1,w2), ...
    pub fn pairs(&self) -> Vec<WindowPair> {
        let mut pairs = Vec::with_capacity(self.windows.len() * (self.windows.len() - 1) / 2);
        for (i, &short) in self.windows.iter().enumerate() {
            for &long in &self.windows[i + 1..] {
                pairs.push(WindowPair { short, long });
            }
        }
        pairs
    }
}

impl Default for WindowCatalog {
    fn default() -> Self {
        Self {
            windows: DEFAULT_WINDOWS.iter().copied().map(WindowSize).collect(),
        }
    }
}

impl TryFrom<Vec<u32>> for WindowCatalog {
    type Error = FactorError;

    fn try_from(value: Vec<u32>) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<WindowCatalog> for Vec<u32> {
    fn from(value: WindowCatalog) -> Self {
        value.windows.into_iter().map(|w| w.0).collect()
    }
}

/// Columns passed through unranked by default
pub const DEFAULT_RANK_EXCLUSIONS: [&str; 9] = [
    "timestamp",
    "symbol",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "home_notional",
    "foreign_notional",
];

/// Cross-sectional ranking configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankConfig {
    /// Columns that are never ranked
    #[serde(default = "default_exclusions")]
    pub exclude: Vec<String>,
    /// Minimum present values for a column to be ranked
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
}

fn default_exclusions() -> Vec<String> {
    DEFAULT_RANK_EXCLUSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_min_observations() -> usize {
    2
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclusions(),
            min_observations: default_min_observations(),
        }
    }
}

impl RankConfig {
    /// Canonical form used for exclusion matching: lowercase, no underscores
    pub fn canonical(name: &str) -> String {
        name.chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Whether `column` is in the exclusion set
    pub fn is_excluded(&self, column: &str) -> bool {
        let canonical = Self::canonical(column);
        self.exclude.iter().any(|e| Self::canonical(e) == canonical)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_observations == 0 {
            return Err(FactorError::ConfigError(
                "min_observations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub windows: WindowCatalog,
    #[serde(default)]
    pub rank: RankConfig,
    /// Skip the column pruner (diagnostics)
    #[serde(default)]
    pub keep_intermediates: bool,
}

impl EngineConfig {
    /// Config with a custom window catalog and default ranking
    pub fn with_windows(minutes: &[u32]) -> Result<Self> {
        Ok(Self {
            windows: WindowCatalog::new(minutes)?,
            ..Self::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.rank.validate()
    }
}
