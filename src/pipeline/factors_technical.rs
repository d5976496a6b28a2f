//! Window indicators over a normalized minute series
//!
//! Per-bar quantities (true range, close deltas, directional movement) are computed
//! once; every other indicator is computed for each window of the catalog. All
//! indicators use only the current and earlier bars, except the forward percent
//! change which is tagged as a label.

use crate::config::{WindowCatalog, WindowSize};
use crate::error::Result;
use crate::pipeline::columns::{BarMetric, FeatureKey, WindowMetric};
use crate::pipeline::engine::ColumnStage;
use crate::pipeline::rolling::{
    divide, lag, lead, zip_with, HalfLifeEwm, RollingExtremum, RollingMean, RollingStdDev,
};
use crate::pipeline::table::FeatureTable;

/// Per-bar inputs shared by all windows
#[derive(Debug, Clone)]
pub struct BarInputs {
    pub close: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub volume: Vec<f64>,
    pub true_range: Vec<f64>,
    pub diff: Vec<f64>,
    pub up: Vec<f64>,
    pub down: Vec<f64>,
    pub prev_high: Vec<f64>,
    pub prev_low: Vec<f64>,
    pub dm_pos: Vec<f64>,
    pub dm_neg: Vec<f64>,
}

impl BarInputs {
    /// Derive the per-bar quantities from price columns
    pub fn new(close: Vec<f64>, high: Vec<f64>, low: Vec<f64>, volume: Vec<f64>) -> Self {
        let true_range = true_range(&high, &low);
        let diff = zip_with(&close, &lag(&close, 1), |c, p| c - p);
        let (up, down) = up_down_moves(&diff);
        let prev_high = lag(&high, 1);
        let prev_low = lag(&low, 1);
        let (dm_pos, dm_neg) = directional_movement(&high, &low);
        Self {
            close,
            high,
            low,
            volume,
            true_range,
            diff,
            up,
            down,
            prev_high,
            prev_low,
            dm_pos,
            dm_neg,
        }
    }

    pub fn from_table(table: &FeatureTable) -> Self {
        let series = table.series();
        Self::new(series.closes(), series.highs(), series.lows(), series.volumes())
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn metric(&self, metric: BarMetric) -> &[f64] {
        match metric {
            BarMetric::TrueRange => &self.true_range,
            BarMetric::Diff => &self.diff,
            BarMetric::Up => &self.up,
            BarMetric::Down => &self.down,
            BarMetric::PrevHigh => &self.prev_high,
            BarMetric::PrevLow => &self.prev_low,
            BarMetric::DmPos => &self.dm_pos,
            BarMetric::DmNeg => &self.dm_neg,
        }
    }
}

/// High minus low per bar
pub fn true_range(high: &[f64], low: &[f64]) -> Vec<f64> {
    zip_with(high, low, |h, l| h - l)
}

/// Split close deltas into gains and losses (both non-negative, undefined stays undefined)
pub fn up_down_moves(diff: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let up = diff.iter().map(|&d| if d < 0.0 { 0.0 } else { d }).collect();
    let down = diff
        .iter()
        .map(|&d| if d > 0.0 { 0.0 } else { d.abs() })
        .collect();
    (up, down)
}

/// Directional movement DM+ / DM-
///
/// A side counts only when it moved in its own direction and strictly further than
/// the opposite side; otherwise it is zero. Both are undefined on the first bar.
pub fn directional_movement(high: &[f64], low: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = high.len();
    let mut pos = vec![f64::NAN; n];
    let mut neg = vec![f64::NAN; n];
    for t in 1..n {
        let up_move = high[t] - high[t - 1];
        let down_move = low[t - 1] - low[t];
        pos[t] = if high[t] > high[t - 1] && up_move > down_move {
            up_move
        } else {
            0.0
        };
        neg[t] = if low[t - 1] > low[t] && down_move > up_move {
            down_move
        } else {
            0.0
        };
    }
    (pos, neg)
}

/// `1 - close[t - w] / close[t]`
pub fn past_pct_change(close: &[f64], window: usize) -> Vec<f64> {
    zip_with(&lag(close, window), close, |past, now| 1.0 - past / now)
}

/// `1 - close[t] / close[t + w]` (looks ahead)
pub fn forward_pct_change(close: &[f64], window: usize) -> Vec<f64> {
    zip_with(close, &lead(close, window), |now, future| 1.0 - now / future)
}

/// RSI from average gain / loss; 100 when the average loss is zero
pub fn rsi(avg_up: &[f64], avg_down: &[f64]) -> Vec<f64> {
    zip_with(avg_up, avg_down, |up, down| {
        if up.is_nan() || down.is_nan() {
            f64::NAN
        } else if down == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + up / down)
        }
    })
}

/// `round(100 * |DI+ - DI-| / (DI+ + DI-))`, ties to even
pub fn directional_index(di_pos: &[f64], di_neg: &[f64]) -> Vec<f64> {
    zip_with(di_pos, di_neg, |p, n| {
        ((p - n).abs() / (p + n) * 100.0).round_ties_even()
    })
}

/// `100 * (close - lowest) / (highest - lowest)`
pub fn stochastic_k(close: &[f64], lowest: &[f64], highest: &[f64]) -> Vec<f64> {
    close
        .iter()
        .zip(lowest.iter().zip(highest))
        .map(|(&c, (&lo, &hi))| (c - lo) / (hi - lo) * 100.0)
        .collect()
}

fn scale(values: &[f64], factor: f64) -> Vec<f64> {
    values.iter().map(|v| v * factor).collect()
}

/// Computes every single-window indicator for each window of the catalog
#[derive(Debug, Clone, Default)]
pub struct WindowIndicatorCalculator {
    windows: WindowCatalog,
}

impl WindowIndicatorCalculator {
    pub fn new(windows: WindowCatalog) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &WindowCatalog {
        &self.windows
    }

    /// All indicators for one window, in [`WindowMetric::ALL`] order
    pub fn compute_window(inputs: &BarInputs, window: WindowSize) -> Vec<(WindowMetric, Vec<f64>)> {
        let w = window.bars();
        let close = &inputs.close;

        let close_sma = RollingMean::compute(w, close);
        let volume_sma = RollingMean::compute(w, &inputs.volume);
        let close_ema = HalfLifeEwm::compute(w, close);
        let close_stdev = RollingStdDev::compute(w, close);
        let close_stdev_ratio = divide(&close_stdev, close);

        let forward = forward_pct_change(close, w);
        let past = past_pct_change(close, w);
        let past_ma = RollingMean::compute(w, &past);
        let past_stdev = RollingStdDev::compute(w, &past);
        let sharpe = divide(&close_sma, &past_stdev);

        let atr = RollingMean::compute(w, &inputs.true_range);

        let avg_up = RollingMean::compute(w, &inputs.up);
        let avg_down = RollingMean::compute(w, &inputs.down);
        let rs = divide(&avg_up, &avg_down);
        let rsi = rsi(&avg_up, &avg_down);

        let dm_pos = HalfLifeEwm::compute(w, &inputs.dm_pos);
        let dm_neg = HalfLifeEwm::compute(w, &inputs.dm_neg);
        let di_pos = scale(&divide(&dm_pos, &atr), 100.0);
        let di_neg = scale(&divide(&dm_neg, &atr), 100.0);
        let dx = directional_index(&di_pos, &di_neg);
        let adx = scale(&HalfLifeEwm::compute(w, &dx), 0.01);

        let lowest = RollingExtremum::compute_min(w, &inputs.low);
        let highest = RollingExtremum::compute_max(w, &inputs.high);
        let stoch_k = stochastic_k(close, &lowest, &highest);
        let stoch_d = RollingMean::compute(w, &stoch_k);

        vec![
            (WindowMetric::CloseSma, close_sma),
            (WindowMetric::VolumeSma, volume_sma),
            (WindowMetric::CloseEma, close_ema),
            (WindowMetric::CloseStdev, close_stdev),
            (WindowMetric::CloseStdevRatio, close_stdev_ratio),
            (WindowMetric::ForwardPctChange, forward),
            (WindowMetric::PastPctChange, past),
            (WindowMetric::PastPctChangeMa, past_ma),
            (WindowMetric::PastPctChangeStdev, past_stdev),
            (WindowMetric::Sharpe, sharpe),
            (WindowMetric::AverageTrueRange, atr),
            (WindowMetric::AvgUp, avg_up),
            (WindowMetric::AvgDown, avg_down),
            (WindowMetric::RelativeStrength, rs),
            (WindowMetric::Rsi, rsi),
            (WindowMetric::DmPos, dm_pos),
            (WindowMetric::DmNeg, dm_neg),
            (WindowMetric::DiPos, di_pos),
            (WindowMetric::DiNeg, di_neg),
            (WindowMetric::Dx, dx),
            (WindowMetric::Adx, adx),
            (WindowMetric::LowestLow, lowest),
            (WindowMetric::HighestHigh, highest),
            (WindowMetric::StochasticK, stoch_k),
            (WindowMetric::StochasticD, stoch_d),
        ]
    }
}

impl ColumnStage for WindowIndicatorCalculator {
    fn name(&self) -> &str {
        "window_indicators"
    }

    fn apply(&self, table: &mut FeatureTable) -> Result<()> {
        let inputs = BarInputs::from_table(table);

        for metric in BarMetric::ALL {
            table.insert(FeatureKey::Bar(metric), inputs.metric(metric).to_vec())?;
        }

        for &window in self.windows.windows() {
            if window.bars() > inputs.len() {
                log::debug!(
                    "Window {} exceeds {} rows, its rolling features stay undefined",
                    window,
                    inputs.len()
                );
            }
            for (metric, values) in Self::compute_window(&inputs, window) {
                table.insert(FeatureKey::Window(metric, window), values)?;
            }
        }
        Ok(())
    }
}
