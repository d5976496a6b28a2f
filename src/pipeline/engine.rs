//! Per-instrument feature pipeline
//!
//! Raw bars are normalized onto the minute grid and then passed through an ordered
//! list of [`ColumnStage`]s: window indicators, cross-period ratios and the pruner.
//! Each instrument is an independent unit of work; a universe is processed in
//! parallel with one task per instrument.

use crate::config::EngineConfig;
use crate::data::{BarStore, MinuteNormalizer, NormalizedSeries};
use crate::error::{FactorError, Result};
use crate::pipeline::composite::CrossPeriodRatios;
use crate::pipeline::factors_technical::WindowIndicatorCalculator;
use crate::pipeline::pruner::ColumnPruner;
use crate::pipeline::table::FeatureTable;
use crate::types::{Bar, Symbol};
use rayon::prelude::*;

/// One step that adds or removes columns of a feature table
pub trait ColumnStage: Send + Sync {
    /// Stage name for logging
    fn name(&self) -> &str;

    /// Transform the table in place
    fn apply(&self, table: &mut FeatureTable) -> Result<()>;
}

/// Normalizer followed by column stages
pub struct FeaturePipeline {
    config: EngineConfig,
    normalizer: MinuteNormalizer,
    stages: Vec<Box<dyn ColumnStage>>,
}

impl FeaturePipeline {
    /// Standard pipeline for a configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let windows = config.windows.clone();
        let keep_intermediates = config.keep_intermediates;
        let mut pipeline = Self {
            config,
            normalizer: MinuteNormalizer::new(),
            stages: Vec::new(),
        };
        pipeline
            .add_stage(Box::new(WindowIndicatorCalculator::new(windows.clone())))
            .add_stage(Box::new(CrossPeriodRatios::new(windows)));
        if !keep_intermediates {
            pipeline.add_stage(Box::new(ColumnPruner::new()));
        }
        Ok(pipeline)
    }

    /// Append a stage
    pub fn add_stage(&mut self, stage: Box<dyn ColumnStage>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the stages over an already normalized series
    pub fn process_series(&self, series: NormalizedSeries) -> Result<FeatureTable> {
        if series.is_empty() {
            return Err(FactorError::empty("normalized series has no rows"));
        }
        let mut table = FeatureTable::new(series);
        for stage in &self.stages {
            stage.apply(&mut table)?;
            log::trace!("Stage {} -> {} columns", stage.name(), table.column_count());
        }
        Ok(table)
    }

    /// Full processing of one instrument's raw bars
    pub fn process(&self, symbol: &str, bars: &[Bar]) -> Result<FeatureTable> {
        log::debug!("Processing {} ({} raw bars)", symbol, bars.len());
        let series = self.normalizer.normalize(bars).map_err(|e| match e {
            FactorError::EmptyInput { context } => {
                FactorError::empty(format!("{}: {}", symbol, context))
            }
            other => other,
        })?;
        if series.is_empty() {
            return Err(FactorError::empty(format!(
                "{}: first bar is not on a minute boundary",
                symbol
            )));
        }

        let table = self.process_series(series)?.with_symbol(symbol);
        log::debug!(
            "Finished {}: {} rows x {} columns",
            symbol,
            table.len(),
            table.column_count()
        );
        Ok(table)
    }

    /// Process every instrument in parallel; results are sorted by symbol
    pub fn process_universe(&self, store: &BarStore) -> Vec<(Symbol, Result<FeatureTable>)> {
        let units: Vec<(&Symbol, &[Bar])> = store.iter().collect();
        let results: Vec<(Symbol, Result<FeatureTable>)> = units
            .into_par_iter()
            .map(|(symbol, bars)| (symbol.clone(), self.process(symbol, bars)))
            .collect();

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        for (symbol, result) in &results {
            if let Err(e) = result {
                log::warn!("Feature generation failed for {}: {}", symbol, e);
            }
        }
        log::info!(
            "Processed {} instruments ({} failed)",
            results.len(),
            failed
        );
        results
    }
}

impl std::fmt::Debug for FeaturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeaturePipeline")
            .field("config", &self.config)
            .field("stages", &self.stage_names())
            .finish()
    }
}
