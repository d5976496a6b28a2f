//! CSV input/output integration tests

use rusty_factors::config::EngineConfig;
use rusty_factors::cross_section::{CrossSectionalRanker, SnapshotBuilder};
use rusty_factors::data::io::{read_bars_csv, write_feature_table_csv, write_ranked_csv};
use rusty_factors::pipeline::FeaturePipeline;
use std::fs;
use tempfile::TempDir;

const BARS: &str = "\
timestamp,symbol,open,high,low,close,trades,volume,vwap,lastSize,turnover,homeNotional,foreignNotional
2020-01-01T00:00:00.000Z,XBTUSD,7160,7161,7159.5,7160.5,120,50000,7160.2,100,698000000,6.98,50000
2020-01-01T00:00:00.000Z,ETHUSD,129.5,129.6,129.4,129.5,10,2000,129.5,1,15400000,15.4,2000
2020-01-01T00:01:00.000Z,XBTUSD,7160.5,7162,7160,7161,80,42000,7161.1,5,586000000,5.86,42000
2020-01-01T00:01:00.000Z,ETHUSD,129.5,129.8,129.5,129.7,12,2500,129.6,4,19300000,19.3,2500
2020-01-01T00:03:00.000Z,XBTUSD,7161,7163,7158,7158,95,61000,7160.0,20,852000000,8.52,61000
2020-01-01T00:03:00.000Z,ETHUSD,129.7,129.9,129.1,129.2,8,1800,129.4,2,13900000,13.9,1800
";

fn write_bars(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("bars.csv");
    fs::write(&path, BARS).unwrap();
    path
}

#[test]
fn test_feature_table_csv() {
    let dir = TempDir::new().unwrap();
    let store = read_bars_csv(&write_bars(&dir)).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.bar_count(), 6);

    let pipeline = FeaturePipeline::new(EngineConfig::with_windows(&[2, 3]).unwrap()).unwrap();
    let table = pipeline
        .process("XBTUSD", store.get("XBTUSD").unwrap())
        .unwrap();
    assert_eq!(table.len(), 4);

    let out = dir.path().join("XBTUSD.csv");
    write_feature_table_csv(&table, &out).unwrap();

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "timestamp");
    assert_eq!(&headers[1], "symbol");
    assert_eq!(&headers[5], "close");
    assert_eq!(headers.len(), 2 + 5 + table.column_count());

    let sma = headers.iter().position(|h| h == "close_sma_2").unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[0][1], "XBTUSD");
    // undefined before the window fills
    assert_eq!(&rows[0][sma], "");
    // gap minute carries the previous close
    assert_eq!(&rows[2][5], "7161");
    assert_eq!(rows[2][sma].parse::<f64>().unwrap(), 7161.0);
}

#[test]
fn test_ranked_csv() {
    let dir = TempDir::new().unwrap();
    let store = read_bars_csv(&write_bars(&dir)).unwrap();

    let mut builder = SnapshotBuilder::new();
    for (symbol, bars) in store.iter() {
        builder.push_bars(symbol, bars).unwrap();
    }
    let snapshots = builder.build().unwrap();
    assert_eq!(snapshots.len(), 3);

    let ranked: Vec<_> = CrossSectionalRanker::default()
        .rank_all(&snapshots)
        .into_iter()
        .map(|(_, r)| r.unwrap())
        .collect();

    let out = dir.path().join("ranked.csv");
    write_ranked_csv(&ranked, &out).unwrap();

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let headers = reader.headers().unwrap().clone();
    let trades = headers.iter().position(|h| h == "trades_rank").unwrap();
    let close = headers.iter().position(|h| h == "close").unwrap();
    assert!(headers.iter().all(|h| h != "close_rank"));

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 6);
    // symbols sorted within a snapshot: ETHUSD then XBTUSD
    assert_eq!(&rows[0][1], "ETHUSD");
    assert_eq!(&rows[0][trades], "0.5");
    assert_eq!(&rows[1][trades], "1");
    assert_eq!(&rows[1][close], "7160.5");
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(read_bars_csv(&dir.path().join("absent.csv")).is_err());
}
