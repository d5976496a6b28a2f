//! CSV adapters
//!
//! Input is the trade-bucket export format
//! (`timestamp,symbol,open,high,low,close,trades,volume,vwap,lastSize,turnover,homeNotional,foreignNotional`).
//! Outputs are feature tables and ranked snapshots; undefined values are written
//! as empty fields.

use crate::cross_section::RankedSnapshot;
use crate::data::BarStore;
use crate::error::Result;
use crate::pipeline::table::FeatureTable;
use crate::types::{Bar, Timestamp};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Base bar columns written before the derived ones
const BAR_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BarRecord {
    timestamp: Timestamp,
    symbol: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    trades: Option<f64>,
    #[serde(default)]
    vwap: Option<f64>,
    #[serde(default)]
    last_size: Option<f64>,
    #[serde(default)]
    turnover: Option<f64>,
    #[serde(default)]
    home_notional: Option<f64>,
    #[serde(default)]
    foreign_notional: Option<f64>,
}

impl From<BarRecord> for Bar {
    fn from(r: BarRecord) -> Self {
        Bar {
            timestamp: r.timestamp,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
            trades: r.trades,
            vwap: r.vwap,
            last_size: r.last_size,
            turnover: r.turnover,
            home_notional: r.home_notional,
            foreign_notional: r.foreign_notional,
        }
    }
}

/// Read bars from any reader, grouped by symbol
pub fn read_bars<R: Read>(reader: R) -> Result<BarStore> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut store = BarStore::new();
    for result in reader.deserialize() {
        let record: BarRecord = result?;
        let symbol = record.symbol.clone();
        store.add_bar(&symbol, record.into());
    }
    log::info!(
        "Loaded {} bars for {} instruments",
        store.bar_count(),
        store.len()
    );
    Ok(store)
}

/// Read a bar CSV file
pub fn read_bars_csv(path: &Path) -> Result<BarStore> {
    read_bars(File::open(path)?)
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

/// Write a feature table: timestamp, symbol, base bar columns, then derived columns
pub fn write_feature_table<W: Write>(table: &FeatureTable, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    let names = table.column_names();

    let mut header = vec!["timestamp".to_string(), "symbol".to_string()];
    header.extend(BAR_COLUMNS.iter().map(|s| s.to_string()));
    header.extend(names);
    writer.write_record(&header)?;

    let columns: Vec<&[f64]> = table.columns().map(|(_, v)| v).collect();
    let symbol = table.symbol().unwrap_or_default();
    for (row, bar) in table.bars().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(bar.timestamp.to_rfc3339());
        record.push(symbol.to_string());
        for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            record.push(format_value(v));
        }
        record.extend(columns.iter().map(|c| format_value(c[row])));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_feature_table_csv(table: &FeatureTable, path: &Path) -> Result<()> {
    write_feature_table(table, File::create(path)?)
}

/// Write ranked snapshots, one row per instrument and timestamp
///
/// The header is the union of the snapshots' columns; a column absent from a
/// snapshot is written empty.
pub fn write_ranked<W: Write>(snapshots: &[RankedSnapshot], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    let mut header: Vec<String> = Vec::new();
    for snapshot in snapshots {
        for name in snapshot.column_names() {
            if !index.contains_key(&name) {
                index.insert(name.clone(), header.len());
                header.push(name);
            }
        }
    }

    let mut full_header = vec!["timestamp".to_string(), "symbol".to_string()];
    full_header.extend(header.iter().cloned());
    writer.write_record(&full_header)?;

    for snapshot in snapshots {
        let names = snapshot.column_names();
        let timestamp = snapshot.timestamp().to_rfc3339();
        for (i, symbol) in snapshot.symbols().iter().enumerate() {
            let mut values = vec![f64::NAN; header.len()];
            let row = snapshot.row(i).unwrap_or_default();
            for (name, v) in names.iter().zip(row) {
                if let Some(&pos) = index.get(name) {
                    values[pos] = v;
                }
            }
            let mut record = Vec::with_capacity(full_header.len());
            record.push(timestamp.clone());
            record.push(symbol.clone());
            record.extend(values.into_iter().map(format_value));
            writer.write_record(&record)?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_ranked_csv(snapshots: &[RankedSnapshot], path: &Path) -> Result<()> {
    write_ranked(snapshots, File::create(path)?)
}
