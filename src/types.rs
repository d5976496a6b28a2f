//! Core types and constants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Instrument symbol
pub type Symbol = String;

/// Price type (using f64 for precision)
pub type Price = f64;

/// Quantity/volume type
pub type Quantity = f64;

/// One trade bucket (OHLCV plus the optional bucket statistics of the feed)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
    /// Number of trades in the bucket
    #[serde(default)]
    pub trades: Option<f64>,
    /// Volume weighted average price
    #[serde(default)]
    pub vwap: Option<Price>,
    /// Size of the last trade
    #[serde(default)]
    pub last_size: Option<Quantity>,
    #[serde(default)]
    pub turnover: Option<f64>,
    #[serde(default)]
    pub home_notional: Option<f64>,
    #[serde(default)]
    pub foreign_notional: Option<f64>,
}

impl Bar {
    /// Create a new bar without the optional bucket statistics
    pub fn new(
        timestamp: Timestamp,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            trades: None,
            vwap: None,
            last_size: None,
            turnover: None,
            home_notional: None,
            foreign_notional: None,
        }
    }

    /// Attach notional fields
    pub fn with_notional(mut self, home: f64, foreign: f64) -> Self {
        self.home_notional = Some(home);
        self.foreign_notional = Some(foreign);
        self
    }

    /// Get price range (high - low), the per-bar true range used by the indicators
    pub fn range(&self) -> Price {
        self.high - self.low
    }

    /// Same bar moved onto another timestamp (forward fill)
    pub fn carried_to(&self, timestamp: Timestamp) -> Self {
        Self { timestamp, ..*self }
    }

    /// First required field that is not a finite number
    pub fn first_non_finite(&self) -> Option<(&'static str, f64)> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
    }

    /// Named numeric fields, optional ones as NaN when absent
    pub fn fields(&self) -> [(&'static str, f64); 11] {
        let opt = |v: Option<f64>| v.unwrap_or(f64::NAN);
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
            ("trades", opt(self.trades)),
            ("vwap", opt(self.vwap)),
            ("last_size", opt(self.last_size)),
            ("turnover", opt(self.turnover)),
            ("home_notional", opt(self.home_notional)),
            ("foreign_notional", opt(self.foreign_notional)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_bar_calculations() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let bar = Bar::new(ts, 100.0, 105.0, 99.0, 103.0, 1000.0);

        assert_eq!(bar.range(), 6.0);
        assert!(bar.first_non_finite().is_none());

        let moved = bar.carried_to(ts + Duration::minutes(1));
        assert_eq!(moved.close, 103.0);
        assert_eq!(moved.timestamp, ts + Duration::minutes(1));
    }

    #[test]
    fn test_non_finite_detection() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let bar = Bar::new(ts, 100.0, f64::NAN, 99.0, 103.0, 1000.0);
        let (field, _) = bar.first_non_finite().unwrap();
        assert_eq!(field, "high");
    }

    #[test]
    fn test_fields_fill_missing_with_nan() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let bar = Bar::new(ts, 1.0, 2.0, 0.5, 1.5, 10.0).with_notional(3.0, 4.0);
        let fields = bar.fields();
        assert_eq!(fields[4], ("volume", 10.0));
        assert!(fields[5].1.is_nan());
        assert_eq!(fields[9], ("home_notional", 3.0));
    }
}
