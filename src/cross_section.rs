//! Cross-sectional percentile ranking
//!
//! A [`Snapshot`] holds one row per instrument for a single timestamp. The ranker
//! replaces every non-excluded column with percentile ranks in (0, 1]; excluded
//! columns (identity and raw price/volume fields) pass through untouched.

use crate::config::RankConfig;
use crate::error::{FactorError, Result};
use crate::pipeline::table::FeatureTable;
use crate::types::{Bar, Symbol, Timestamp};
use hashbrown::HashMap;
use rayon::prelude::*;
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker};
use std::collections::BTreeMap;

/// Percentile ranks of the present (non-NaN) values
///
/// Ties share the average of their ranks; the result is `rank / present`, so the
/// largest value maps to 1.0. Missing values stay NaN, and a column with fewer than
/// `min_observations` present values is entirely NaN.
pub fn percentile_ranks(values: &[f64], min_observations: usize) -> Vec<f64> {
    let present: Vec<(usize, f64)> = values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .collect();

    let mut out = vec![f64::NAN; values.len()];
    if present.len() < min_observations.max(1) {
        return out;
    }

    let count = present.len() as f64;
    let mut data = Data::new(present.iter().map(|(_, v)| *v).collect::<Vec<f64>>());
    let ranks = data.ranks(RankTieBreaker::Average);
    for ((idx, _), rank) in present.iter().zip(ranks) {
        out[*idx] = rank / count;
    }
    out
}

/// One timestamp across instruments, column-oriented
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    timestamp: Timestamp,
    symbols: Vec<Symbol>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl Snapshot {
    /// Empty snapshot for the given instruments
    pub fn new(timestamp: Timestamp, symbols: Vec<Symbol>) -> Result<Self> {
        let duplicate = {
            let mut seen = hashbrown::HashSet::with_capacity(symbols.len());
            symbols.iter().find(|s| !seen.insert(s.as_str())).cloned()
        };
        if let Some(dup) = duplicate {
            return Err(FactorError::DataError(format!(
                "duplicate symbol {} in snapshot at {}",
                dup, timestamp
            )));
        }
        Ok(Self {
            timestamp,
            symbols,
            columns: BTreeMap::new(),
        })
    }

    /// Add a column (name is lower-cased); one value per instrument, NaN = missing
    pub fn insert_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        let name = name.to_lowercase();
        if values.len() != self.symbols.len() {
            return Err(FactorError::DataError(format!(
                "column {} has {} values for {} instruments",
                name,
                values.len(),
                self.symbols.len()
            )));
        }
        if self.columns.contains_key(&name) {
            return Err(FactorError::DataError(format!(
                "duplicate column {} in snapshot",
                name
            )));
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Number of instruments
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(&name.to_lowercase()).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }
}

/// Snapshot with eligible columns converted to percentile ranks
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSnapshot {
    timestamp: Timestamp,
    symbols: Vec<Symbol>,
    passthrough: BTreeMap<String, Vec<f64>>,
    ranks: BTreeMap<String, Vec<f64>>,
}

impl RankedSnapshot {
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Ranks of a source column
    pub fn rank(&self, column: &str) -> Option<&[f64]> {
        self.ranks.get(&column.to_lowercase()).map(Vec::as_slice)
    }

    /// Unranked (excluded) column, exactly as received
    pub fn passthrough(&self, column: &str) -> Option<&[f64]> {
        self.passthrough.get(&column.to_lowercase()).map(Vec::as_slice)
    }

    pub fn ranked_columns(&self) -> Vec<&str> {
        self.ranks.keys().map(String::as_str).collect()
    }

    pub fn passthrough_columns(&self) -> Vec<&str> {
        self.passthrough.keys().map(String::as_str).collect()
    }

    /// Export header after timestamp/symbol: pass-through names, then `<column>_rank`
    pub fn column_names(&self) -> Vec<String> {
        self.passthrough
            .keys()
            .cloned()
            .chain(self.ranks.keys().map(|k| format!("{}_rank", k)))
            .collect()
    }

    /// Values of one instrument row in [`column_names`](Self::column_names) order,
    /// `None` past the last instrument
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.symbols.len() {
            return None;
        }
        self.passthrough
            .values()
            .chain(self.ranks.values())
            .map(|c| c.get(index).copied())
            .collect()
    }
}

/// Ranks each snapshot column across instruments
#[derive(Debug, Clone, Default)]
pub struct CrossSectionalRanker {
    config: RankConfig,
}

impl CrossSectionalRanker {
    pub fn new(config: RankConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    /// Rank one snapshot
    pub fn rank(&self, snapshot: &Snapshot) -> Result<RankedSnapshot> {
        if snapshot.is_empty() {
            return Err(FactorError::empty(format!(
                "snapshot at {} has no instruments",
                snapshot.timestamp
            )));
        }

        let mut passthrough = BTreeMap::new();
        let mut ranks = BTreeMap::new();
        for (name, values) in &snapshot.columns {
            if self.config.is_excluded(name) {
                passthrough.insert(name.clone(), values.clone());
            } else {
                ranks.insert(
                    name.clone(),
                    percentile_ranks(values, self.config.min_observations),
                );
            }
        }

        Ok(RankedSnapshot {
            timestamp: snapshot.timestamp,
            symbols: snapshot.symbols.clone(),
            passthrough,
            ranks,
        })
    }

    /// Rank many snapshots in parallel, one task per timestamp, in input order
    pub fn rank_all(&self, snapshots: &[Snapshot]) -> Vec<(Timestamp, Result<RankedSnapshot>)> {
        let results: Vec<(Timestamp, Result<RankedSnapshot>)> = snapshots
            .par_iter()
            .map(|s| (s.timestamp, self.rank(s)))
            .collect();
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        log::info!("Ranked {} snapshots ({} failed)", results.len(), failed);
        results
    }
}

type Row = (Symbol, Vec<(usize, f64)>);

/// Groups per-instrument rows into per-timestamp snapshots
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    names: Vec<String>,
    name_index: HashMap<String, usize>,
    rows: BTreeMap<Timestamp, Vec<Row>>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, name: &str) -> usize {
        let name = name.to_lowercase();
        if let Some(&idx) = self.name_index.get(&name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.clone());
        self.name_index.insert(name, idx);
        idx
    }

    /// Add one instrument's values at one timestamp
    ///
    /// A later row for the same instrument and timestamp replaces the earlier one.
    pub fn push_row<'a>(
        &mut self,
        timestamp: Timestamp,
        symbol: &str,
        fields: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<()> {
        let values: Vec<(usize, f64)> = fields
            .into_iter()
            .map(|(name, v)| (self.intern(name), v))
            .collect();
        let rows = self.rows.entry(timestamp).or_default();
        match rows.iter().position(|(s, _)| s == symbol) {
            Some(pos) => {
                log::warn!("Replacing duplicate row of {} at {}", symbol, timestamp);
                rows[pos].1 = values;
            }
            None => rows.push((symbol.to_string(), values)),
        }
        Ok(())
    }

    /// Add raw bars of one instrument
    pub fn push_bars(&mut self, symbol: &str, bars: &[Bar]) -> Result<()> {
        for bar in bars {
            self.push_row(bar.timestamp, symbol, bar.fields())?;
        }
        Ok(())
    }

    /// Add every row of a processed feature table
    pub fn push_table(&mut self, table: &FeatureTable) -> Result<()> {
        let symbol = table
            .symbol()
            .ok_or_else(|| FactorError::DataError("feature table has no symbol".to_string()))?
            .to_string();
        let names: Vec<String> = table.column_names();
        let columns: Vec<&[f64]> = table.columns().map(|(_, v)| v).collect();

        for (row, bar) in table.bars().iter().enumerate() {
            let derived = names
                .iter()
                .zip(&columns)
                .map(|(name, col)| (name.as_str(), col[row]));
            let fields: Vec<(&str, f64)> = bar.fields().into_iter().chain(derived).collect();
            self.push_row(bar.timestamp, &symbol, fields)?;
        }
        Ok(())
    }

    /// Number of distinct timestamps
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One snapshot per timestamp, ascending; absent values are NaN
    pub fn build(self) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::with_capacity(self.rows.len());
        for (timestamp, rows) in self.rows {
            let symbols: Vec<Symbol> = rows.iter().map(|(s, _)| s.clone()).collect();
            let mut columns: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
            for (i, (_, values)) in rows.iter().enumerate() {
                for &(idx, v) in values {
                    columns
                        .entry(idx)
                        .or_insert_with(|| vec![f64::NAN; rows.len()])[i] = v;
                }
            }

            let mut snapshot = Snapshot::new(timestamp, symbols)?;
            for (idx, values) in columns {
                snapshot.insert_column(&self.names[idx], values)?;
            }
            snapshots.push(snapshot);
        }
        log::debug!("Built {} snapshots", snapshots.len());
        Ok(snapshots)
    }
}
