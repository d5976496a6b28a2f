//! Feature pipeline: indicators, cross-period ratios and pruning

pub mod columns;
pub mod composite;
pub mod engine;
pub mod factors_technical;
pub mod pruner;
pub mod rolling;
pub mod table;

pub use columns::{BarMetric, FeatureKey, FeatureRole, RatioMetric, WindowMetric};
pub use composite::CrossPeriodRatios;
pub use engine::{ColumnStage, FeaturePipeline};
pub use factors_technical::{BarInputs, WindowIndicatorCalculator};
pub use pruner::ColumnPruner;
pub use rolling::{HalfLifeEwm, RollingExtremum, RollingMean, RollingStdDev};
pub use table::FeatureTable;
