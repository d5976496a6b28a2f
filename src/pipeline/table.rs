//! Per-instrument feature table

use crate::data::NormalizedSeries;
use crate::error::{FactorError, Result};
use crate::pipeline::columns::{FeatureKey, FeatureRole};
use crate::types::{Bar, Symbol, Timestamp};
use std::collections::BTreeMap;

/// Normalized bars plus derived feature columns, all aligned to the same index
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    symbol: Option<Symbol>,
    series: NormalizedSeries,
    columns: BTreeMap<FeatureKey, Vec<f64>>,
}

impl FeatureTable {
    /// Empty table over a normalized series
    pub fn new(series: NormalizedSeries) -> Self {
        Self {
            symbol: None,
            series,
            columns: BTreeMap::new(),
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<Symbol>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn series(&self) -> &NormalizedSeries {
        &self.series
    }

    pub fn bars(&self) -> &[Bar] {
        self.series.bars()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.series.timestamps()
    }

    /// Add or replace a column; its length must match the row count
    pub fn insert(&mut self, key: FeatureKey, values: Vec<f64>) -> Result<()> {
        if values.len() != self.len() {
            return Err(FactorError::DataError(format!(
                "column {} has {} values, table has {} rows",
                key,
                values.len(),
                self.len()
            )));
        }
        self.columns.insert(key, values);
        Ok(())
    }

    pub fn get(&self, key: &FeatureKey) -> Option<&[f64]> {
        self.columns.get(key).map(Vec::as_slice)
    }

    /// Column that must exist
    pub fn require(&self, key: &FeatureKey) -> Result<&[f64]> {
        self.get(key)
            .ok_or_else(|| FactorError::ColumnNotFound(key.to_string()))
    }

    pub fn contains(&self, key: &FeatureKey) -> bool {
        self.columns.contains_key(key)
    }

    /// Remove a column if present
    pub fn remove(&mut self, key: &FeatureKey) -> Option<Vec<f64>> {
        self.columns.remove(key)
    }

    /// Keep only the columns for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&FeatureKey) -> bool) {
        self.columns.retain(|k, _| keep(k));
    }

    /// Number of derived columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &FeatureKey> {
        self.columns.keys()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&FeatureKey, &[f64])> {
        self.columns.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn keys_with_role(&self, role: FeatureRole) -> Vec<FeatureKey> {
        self.columns
            .keys()
            .filter(|k| k.role() == role)
            .copied()
            .collect()
    }

    /// Columns safe to use as live inputs
    pub fn signal_keys(&self) -> Vec<FeatureKey> {
        self.keys_with_role(FeatureRole::Signal)
    }

    /// Lookahead columns (labels)
    pub fn label_keys(&self) -> Vec<FeatureKey> {
        self.keys_with_role(FeatureRole::Label)
    }

    /// Value of a column at a row
    pub fn value(&self, key: &FeatureKey, row: usize) -> Option<f64> {
        self.columns.get(key).and_then(|c| c.get(row)).copied()
    }

    /// Value of a column at a timestamp
    pub fn value_at(&self, key: &FeatureKey, timestamp: Timestamp) -> Option<f64> {
        let row = self.series.position(timestamp)?;
        self.value(key, row)
    }

    /// Derived column names in key order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().map(|k| k.to_string()).collect()
    }
}
