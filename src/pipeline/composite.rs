//! Cross-period ratio features
//!
//! For every pair of distinct windows, compares an indicator computed at the two
//! lookbacks. Moving averages are expressed as long / short; the stochastic %D
//! and RSI oscillators as short / long.

use crate::config::{WindowCatalog, WindowPair};
use crate::error::Result;
use crate::pipeline::columns::{FeatureKey, RatioMetric};
use crate::pipeline::engine::ColumnStage;
use crate::pipeline::rolling::divide;
use crate::pipeline::table::FeatureTable;

/// Generates ratio columns for all window pairs
#[derive(Debug, Clone, Default)]
pub struct CrossPeriodRatios {
    windows: WindowCatalog,
}

impl CrossPeriodRatios {
    pub fn new(windows: WindowCatalog) -> Self {
        Self { windows }
    }

    /// Ratio of one indicator family over one pair
    pub fn ratio(table: &FeatureTable, metric: RatioMetric, pair: WindowPair) -> Result<Vec<f64>> {
        let (num, den) = metric.orientation(pair);
        let numerator = table.require(&FeatureKey::Window(metric.source(), num))?;
        let denominator = table.require(&FeatureKey::Window(metric.source(), den))?;
        Ok(divide(numerator, denominator))
    }
}

impl ColumnStage for CrossPeriodRatios {
    fn name(&self) -> &str {
        "cross_period_ratios"
    }

    fn apply(&self, table: &mut FeatureTable) -> Result<()> {
        let pairs = self.windows.pairs();
        for &pair in &pairs {
            for metric in RatioMetric::ALL {
                let values = Self::ratio(table, metric, pair)?;
                table.insert(FeatureKey::Ratio(metric, pair), values)?;
            }
        }
        log::debug!(
            "Added {} ratio columns over {} window pairs",
            pairs.len() * RatioMetric::ALL.len(),
            pairs.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowSize;
    use crate::data::MinuteNormalizer;
    use crate::error::FactorError;
    use crate::pipeline::columns::WindowMetric;
    use crate::types::Bar;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn empty_table(rows: usize) -> FeatureTable {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let bars: Vec<Bar> = (0..rows)
            .map(|i| Bar::new(t0 + Duration::minutes(i as i64), 1.0, 1.0, 1.0, 1.0, 1.0))
            .collect();
        FeatureTable::new(MinuteNormalizer::new().normalize(&bars).unwrap())
    }

    fn seed(table: &mut FeatureTable, metric: WindowMetric, window: u32, values: Vec<f64>) {
        table
            .insert(FeatureKey::Window(metric, WindowSize(window)), values)
            .unwrap();
    }

    #[test]
    fn test_orientation_per_family() {
        let mut table = empty_table(1);
        for (w, v) in [(5, 2.0), (10, 8.0)] {
            seed(&mut table, WindowMetric::CloseSma, w, vec![v]);
            seed(&mut table, WindowMetric::VolumeSma, w, vec![v]);
            seed(&mut table, WindowMetric::CloseEma, w, vec![v]);
            seed(&mut table, WindowMetric::StochasticD, w, vec![v]);
            seed(&mut table, WindowMetric::Rsi, w, vec![v]);
        }

        let stage = CrossPeriodRatios::new(WindowCatalog::new(&[5, 10]).unwrap());
        stage.apply(&mut table).unwrap();

        let pair = WindowPair { short: WindowSize(5), long: WindowSize(10) };
        let get = |m| table.get(&FeatureKey::Ratio(m, pair)).unwrap()[0];
        assert_eq!(get(RatioMetric::CloseSma), 4.0);
        assert_eq!(get(RatioMetric::VolumeSma), 4.0);
        assert_eq!(get(RatioMetric::CloseEma), 4.0);
        assert_eq!(get(RatioMetric::Stochastic), 0.25);
        assert_eq!(get(RatioMetric::Rsi), 0.25);
    }

    #[test]
    fn test_swapped_pair_gives_reciprocal() {
        let mut table = empty_table(3);
        seed(&mut table, WindowMetric::Rsi, 5, vec![62.5, 17.0, 99.0]);
        seed(&mut table, WindowMetric::Rsi, 10, vec![40.0, 71.25, 3.5]);
        seed(&mut table, WindowMetric::CloseSma, 5, vec![101.0, 99.5, 100.25]);
        seed(&mut table, WindowMetric::CloseSma, 10, vec![100.0, 100.5, 98.0]);

        let pair = WindowPair { short: WindowSize(5), long: WindowSize(10) };
        let swapped = WindowPair { short: WindowSize(10), long: WindowSize(5) };
        for metric in [RatioMetric::Rsi, RatioMetric::CloseSma] {
            let a = CrossPeriodRatios::ratio(&table, metric, pair).unwrap();
            let b = CrossPeriodRatios::ratio(&table, metric, swapped).unwrap();
            for (x, y) in a.iter().zip(&b) {
                assert_relative_eq!(x * y, 1.0, epsilon = 1e-12);
            }
        }

        // rsi compares short over long
        let rsi = CrossPeriodRatios::ratio(&table, RatioMetric::Rsi, pair).unwrap();
        assert_relative_eq!(rsi[0], 62.5 / 40.0);
    }

    #[test]
    fn test_zero_denominator_is_not_clamped() {
        let mut table = empty_table(2);
        seed(&mut table, WindowMetric::Rsi, 5, vec![50.0, 0.0]);
        seed(&mut table, WindowMetric::Rsi, 10, vec![0.0, 0.0]);
        let pair = WindowPair { short: WindowSize(5), long: WindowSize(10) };

        let out = CrossPeriodRatios::ratio(&table, RatioMetric::Rsi, pair).unwrap();
        assert_eq!(out[0], f64::INFINITY);
        assert!(out[1].is_nan());
    }

    #[test]
    fn test_missing_source_column() {
        let table = empty_table(1);
        let pair = WindowPair { short: WindowSize(5), long: WindowSize(10) };
        let err = CrossPeriodRatios::ratio(&table, RatioMetric::CloseSma, pair).unwrap_err();
        assert!(matches!(err, FactorError::ColumnNotFound(_)));
    }
}
