//! Minute-grid normalization
//!
//! Places one instrument's raw trade buckets onto an exact one-minute cadence.
//! Missing minutes are forward-filled from the most recent earlier bar, so every
//! downstream window of `W` bars spans exactly `W` minutes.

use crate::error::{FactorError, Result};
use crate::types::{Bar, Timestamp};
use chrono::{Duration, Timelike};

/// Bars on an exact one-minute grid with no gaps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSeries {
    bars: Vec<Bar>,
    /// `true` where the grid point had a raw bar, `false` where it was filled
    observed: Vec<bool>,
}

impl NormalizedSeries {
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn observed(&self) -> &[bool] {
        &self.observed
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of forward-filled grid points
    pub fn filled_count(&self) -> usize {
        self.observed.iter().filter(|o| !**o).count()
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// Row index of `timestamp`, if it lies on the grid
    pub fn position(&self, timestamp: Timestamp) -> Option<usize> {
        let first = self.first_timestamp()?;
        if timestamp < first || !is_minute_aligned(timestamp) {
            return None;
        }
        let idx = (timestamp - first).num_minutes() as usize;
        (idx < self.bars.len()).then_some(idx)
    }

    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

fn is_minute_aligned(ts: Timestamp) -> bool {
    ts.second() == 0 && ts.nanosecond() == 0
}

fn floor_minute(ts: Timestamp) -> Timestamp {
    ts - Duration::seconds(ts.second() as i64) - Duration::nanoseconds(ts.nanosecond() as i64)
}

/// Resamples raw bars to a one-minute grid
#[derive(Debug, Clone, Copy, Default)]
pub struct MinuteNormalizer;

impl MinuteNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Input positions of the bars that survive de-duplication, in timestamp order
    fn surviving_positions(&self, bars: &[Bar]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..bars.len()).collect();
        // stable: equal timestamps keep input order, so "last" means last in input
        order.sort_by_key(|&i| bars[i].timestamp);

        let mut unique: Vec<usize> = Vec::with_capacity(order.len());
        for i in order {
            match unique.last_mut() {
                Some(last) if bars[*last].timestamp == bars[i].timestamp => *last = i,
                _ => unique.push(i),
            }
        }
        if unique.len() < bars.len() {
            log::warn!("Dropped {} duplicate bars", bars.len() - unique.len());
        }
        unique
    }

    /// Sort by timestamp and drop duplicate timestamps, keeping the last occurrence
    pub fn deduplicate(&self, bars: &[Bar]) -> Vec<Bar> {
        self.surviving_positions(bars)
            .into_iter()
            .map(|i| bars[i])
            .collect()
    }

    /// Normalize one instrument's bars onto the minute grid
    ///
    /// Only bars that survive de-duplication are checked; a malformed bar reports
    /// its position in `bars`.
    pub fn normalize(&self, bars: &[Bar]) -> Result<NormalizedSeries> {
        let positions = self.surviving_positions(bars);
        for &index in &positions {
            if let Some((field, value)) = bars[index].first_non_finite() {
                return Err(FactorError::MalformedBar { index, field, value });
            }
        }

        let raw: Vec<&Bar> = positions.iter().map(|&i| &bars[i]).collect();
        let (first, last) = match (raw.first(), raw.last()) {
            (Some(f), Some(l)) => (f.timestamp, l.timestamp),
            _ => return Err(FactorError::empty("no bars after de-duplication")),
        };

        if !is_minute_aligned(first) {
            log::warn!("First bar at {} is not on a minute boundary, series is empty", first);
            return Ok(NormalizedSeries::default());
        }

        let end = floor_minute(last);
        let len = (end - first).num_minutes() as usize + 1;
        let mut out = NormalizedSeries {
            bars: Vec::with_capacity(len),
            observed: Vec::with_capacity(len),
        };

        // the first grid point is the first raw bar, so `latest` is always set
        let mut latest = raw[0];
        let mut next_raw = 0;
        let mut ts = first;
        for _ in 0..len {
            let mut exact = false;
            while next_raw < raw.len() && raw[next_raw].timestamp <= ts {
                exact = raw[next_raw].timestamp == ts;
                latest = raw[next_raw];
                next_raw += 1;
            }
            out.bars.push(latest.carried_to(ts));
            out.observed.push(exact);
            ts += Duration::minutes(1);
        }

        log::debug!(
            "Normalized {} raw bars into {} minutes ({} filled)",
            raw.len(),
            out.len(),
            out.filled_count()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn bar_at(minutes: i64, close: f64) -> Bar {
        Bar::new(
            t0() + Duration::minutes(minutes),
            close - 1.0,
            close + 1.0,
            close - 2.0,
            close,
            100.0,
        )
    }

    #[test]
    fn test_fills_gaps_forward() {
        let bars = vec![bar_at(0, 10.0), bar_at(3, 13.0)];
        let series = MinuteNormalizer::new().normalize(&bars).unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.closes(), vec![10.0, 10.0, 10.0, 13.0]);
        assert_eq!(series.observed(), &[true, false, false, true]);
        assert_eq!(series.filled_count(), 2);
        assert_eq!(series.bars()[2].timestamp, t0() + Duration::minutes(2));
    }

    #[test]
    fn test_contiguous_input_is_unchanged() {
        let bars: Vec<Bar> = (0..5).map(|i| bar_at(i, 10.0 + i as f64)).collect();
        let series = MinuteNormalizer::new().normalize(&bars).unwrap();
        assert_eq!(series.bars(), bars.as_slice());
        assert_eq!(series.filled_count(), 0);
    }

    #[test]
    fn test_duplicates_keep_last() {
        let bars = vec![bar_at(0, 10.0), bar_at(1, 11.0), bar_at(1, 99.0)];
        let series = MinuteNormalizer::new().normalize(&bars).unwrap();
        assert_eq!(series.closes(), vec![10.0, 99.0]);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let bars = vec![bar_at(2, 12.0), bar_at(0, 10.0), bar_at(1, 11.0)];
        let series = MinuteNormalizer::new().normalize(&bars).unwrap();
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_off_grid_bar_feeds_forward_fill() {
        let mut mid = bar_at(1, 50.0);
        mid.timestamp = mid.timestamp + Duration::seconds(30);
        let bars = vec![bar_at(0, 10.0), mid, bar_at(3, 13.0)];
        let series = MinuteNormalizer::new().normalize(&bars).unwrap();

        // the 00:01:30 bar is the most recent bar for 00:02
        assert_eq!(series.closes(), vec![10.0, 10.0, 50.0, 13.0]);
        assert_eq!(series.observed(), &[true, false, false, true]);
    }

    #[test]
    fn test_unaligned_start_is_empty() {
        let mut first = bar_at(0, 10.0);
        first.timestamp = first.timestamp + Duration::seconds(15);
        let series = MinuteNormalizer::new()
            .normalize(&[first, bar_at(2, 12.0)])
            .unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_empty_input_fails() {
        let err = MinuteNormalizer::new().normalize(&[]).unwrap_err();
        assert!(matches!(err, FactorError::EmptyInput { .. }));
    }

    #[test]
    fn test_non_finite_input_fails() {
        let mut bad = bar_at(1, 11.0);
        bad.close = f64::INFINITY;
        let err = MinuteNormalizer::new()
            .normalize(&[bar_at(0, 10.0), bad])
            .unwrap_err();
        assert!(matches!(
            err,
            FactorError::MalformedBar { index: 1, field: "close", .. }
        ));
    }

    #[test]
    fn test_superseded_bad_bar_is_ignored() {
        let mut bad = bar_at(1, 11.0);
        bad.close = f64::NAN;
        let series = MinuteNormalizer::new()
            .normalize(&[bar_at(0, 10.0), bad, bar_at(1, 12.0), bar_at(2, 13.0)])
            .unwrap();
        assert_eq!(series.closes(), vec![10.0, 12.0, 13.0]);
        assert_eq!(series.filled_count(), 0);
    }

    #[test]
    fn test_surviving_bad_bar_reports_input_position() {
        let mut bad = bar_at(1, 11.0);
        bad.volume = f64::NAN;
        // the good minute-1 bar comes first, so the bad one is kept
        let err = MinuteNormalizer::new()
            .normalize(&[bar_at(2, 13.0), bar_at(1, 12.0), bar_at(0, 10.0), bad])
            .unwrap_err();
        assert!(matches!(
            err,
            FactorError::MalformedBar { index: 3, field: "volume", .. }
        ));
    }

    #[test]
    fn test_position_lookup() {
        let bars = vec![bar_at(0, 10.0), bar_at(4, 14.0)];
        let series = MinuteNormalizer::new().normalize(&bars).unwrap();
        assert_eq!(series.position(t0() + Duration::minutes(3)), Some(3));
        assert_eq!(series.position(t0() + Duration::minutes(5)), None);
        assert_eq!(series.position(t0() - Duration::minutes(1)), None);
    }
}
