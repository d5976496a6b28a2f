//! # Rusty-Factors
//!
//! A minute-bar feature engine for cross-sectional trading research.
//!
//! Raw OHLCV bars of each instrument are normalized onto a gap-free minute grid,
//! enriched with rolling technical indicators over a catalog of lookback windows,
//! compared across window pairs, pruned of staging columns, and finally ranked
//! across instruments at every timestamp.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rusty_factors::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let store = rusty_factors::data::io::read_bars_csv(Path::new("bars.csv"))?;
//!     let config = EngineConfig::default();
//!     let pipeline = FeaturePipeline::new(config.clone())?;
//!
//!     let mut builder = SnapshotBuilder::new();
//!     for (_symbol, table) in pipeline.process_universe(&store) {
//!         builder.push_table(&table?)?;
//!     }
//!
//!     let ranker = CrossSectionalRanker::new(config.rank)?;
//!     for (timestamp, ranked) in ranker.rank_all(&builder.build()?) {
//!         println!("{}: {} instruments", timestamp, ranked?.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cross_section;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::config::{EngineConfig, RankConfig, WindowCatalog, WindowPair, WindowSize};
    pub use crate::cross_section::{
        CrossSectionalRanker, RankedSnapshot, Snapshot, SnapshotBuilder,
    };
    pub use crate::data::{BarStore, MinuteNormalizer, NormalizedSeries};
    pub use crate::error::{FactorError, Result};
    pub use crate::pipeline::{ColumnStage, FeatureKey, FeaturePipeline, FeatureRole, FeatureTable};
    pub use crate::types::*;
}
