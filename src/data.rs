//! Market data handling

pub mod io;
pub mod resample;

pub use resample::{MinuteNormalizer, NormalizedSeries};

use crate::types::{Bar, Symbol};
use hashbrown::HashMap;

/// Raw bars grouped by instrument, as handed over by the acquisition side
#[derive(Debug, Clone, Default)]
pub struct BarStore {
    bars: HashMap<Symbol, Vec<Bar>>,
}

impl BarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bar for an instrument
    pub fn add_bar(&mut self, symbol: &str, bar: Bar) {
        self.bars.entry(symbol.to_string()).or_default().push(bar);
    }

    /// Append many bars for an instrument
    pub fn add_bars(&mut self, symbol: &str, bars: impl IntoIterator<Item = Bar>) {
        self.bars.entry(symbol.to_string()).or_default().extend(bars);
    }

    /// Bars for an instrument in insertion order
    pub fn get(&self, symbol: &str) -> Option<&[Bar]> {
        self.bars.get(symbol).map(Vec::as_slice)
    }

    /// Instruments in sorted order
    pub fn symbols(&self) -> Vec<&Symbol> {
        let mut symbols: Vec<&Symbol> = self.bars.keys().collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Total number of bars across instruments
    pub fn bar_count(&self) -> usize {
        self.bars.values().map(Vec::len).sum()
    }

    /// (symbol, bars) in sorted symbol order
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &[Bar])> {
        self.symbols()
            .into_iter()
            .map(move |s| (s, self.bars[s].as_slice()))
    }
}
