//! Removal of staging columns

use crate::error::Result;
use crate::pipeline::columns::FeatureKey;
use crate::pipeline::engine::ColumnStage;
use crate::pipeline::table::FeatureTable;

/// Drops intermediate columns (and any extra keys it was given)
#[derive(Debug, Clone, Default)]
pub struct ColumnPruner {
    extra: Vec<FeatureKey>,
}

impl ColumnPruner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also drop these keys
    pub fn with_extra(mut self, keys: impl IntoIterator<Item = FeatureKey>) -> Self {
        self.extra.extend(keys);
        self
    }

    /// Drop keys if present; absent keys are ignored. Returns how many were removed.
    pub fn drop_columns(table: &mut FeatureTable, keys: &[FeatureKey]) -> usize {
        keys.iter().filter(|k| table.remove(k).is_some()).count()
    }

    /// Prune a table in place, returning how many columns were removed
    pub fn prune(&self, table: &mut FeatureTable) -> usize {
        let before = table.column_count();
        table.retain(|k| !k.is_intermediate());
        let removed = before - table.column_count();
        removed + Self::drop_columns(table, &self.extra)
    }
}

impl ColumnStage for ColumnPruner {
    fn name(&self) -> &str {
        "column_pruner"
    }

    fn apply(&self, table: &mut FeatureTable) -> Result<()> {
        let removed = self.prune(table);
        log::debug!("Pruned {} columns, {} remain", removed, table.column_count());
        Ok(())
    }
}
