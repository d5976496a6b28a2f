//! Feature schema
//!
//! Every derived column is identified by a [`FeatureKey`]: a per-bar quantity, a
//! single-window indicator, or a cross-period ratio for a pair of windows. The
//! key decides the column's export name and its [`FeatureRole`].

use crate::config::{WindowCatalog, WindowPair, WindowSize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a column may be used downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureRole {
    /// Uses only current and past bars
    Signal,
    /// Looks ahead of the current bar; labeling only, never a live input
    Label,
    /// Staging value removed by the pruner
    Intermediate,
}

/// Quantities computed once per bar, without a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BarMetric {
    TrueRange,
    Diff,
    Up,
    Down,
    PrevHigh,
    PrevLow,
    DmPos,
    DmNeg,
}

impl BarMetric {
    pub const ALL: [BarMetric; 8] = [
        BarMetric::TrueRange,
        BarMetric::Diff,
        BarMetric::Up,
        BarMetric::Down,
        BarMetric::PrevHigh,
        BarMetric::PrevLow,
        BarMetric::DmPos,
        BarMetric::DmNeg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BarMetric::TrueRange => "true_range",
            BarMetric::Diff => "diff",
            BarMetric::Up => "up",
            BarMetric::Down => "down",
            BarMetric::PrevHigh => "prev_high",
            BarMetric::PrevLow => "prev_low",
            BarMetric::DmPos => "dm_pos",
            BarMetric::DmNeg => "dm_neg",
        }
    }

    pub fn role(&self) -> FeatureRole {
        match self {
            BarMetric::TrueRange => FeatureRole::Signal,
            _ => FeatureRole::Intermediate,
        }
    }
}

/// Indicators computed for each window size
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WindowMetric {
    CloseSma,
    VolumeSma,
    CloseEma,
    CloseStdev,
    CloseStdevRatio,
    ForwardPctChange,
    PastPctChange,
    PastPctChangeMa,
    PastPctChangeStdev,
    Sharpe,
    AverageTrueRange,
    AvgUp,
    AvgDown,
    RelativeStrength,
    Rsi,
    DmPos,
    DmNeg,
    DiPos,
    DiNeg,
    Dx,
    Adx,
    LowestLow,
    HighestHigh,
    StochasticK,
    StochasticD,
}

impl WindowMetric {
    /// Production order within one window
    pub const ALL: [WindowMetric; 25] = [
        WindowMetric::CloseSma,
        WindowMetric::VolumeSma,
        WindowMetric::CloseEma,
        WindowMetric::CloseStdev,
        WindowMetric::CloseStdevRatio,
        WindowMetric::ForwardPctChange,
        WindowMetric::PastPctChange,
        WindowMetric::PastPctChangeMa,
        WindowMetric::PastPctChangeStdev,
        WindowMetric::Sharpe,
        WindowMetric::AverageTrueRange,
        WindowMetric::AvgUp,
        WindowMetric::AvgDown,
        WindowMetric::RelativeStrength,
        WindowMetric::Rsi,
        WindowMetric::DmPos,
        WindowMetric::DmNeg,
        WindowMetric::DiPos,
        WindowMetric::DiNeg,
        WindowMetric::Dx,
        WindowMetric::Adx,
        WindowMetric::LowestLow,
        WindowMetric::HighestHigh,
        WindowMetric::StochasticK,
        WindowMetric::StochasticD,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowMetric::CloseSma => "close_sma",
            WindowMetric::VolumeSma => "volume_sma",
            WindowMetric::CloseEma => "close_ema",
            WindowMetric::CloseStdev => "close_stdev",
            WindowMetric::CloseStdevRatio => "close_stdev_ratio",
            WindowMetric::ForwardPctChange => "close_pct_change_fwd",
            WindowMetric::PastPctChange => "close_pct_change_past",
            WindowMetric::PastPctChangeMa => "close_pct_change_past_ma",
            WindowMetric::PastPctChangeStdev => "close_pct_change_past_stdev",
            WindowMetric::Sharpe => "sharpe",
            WindowMetric::AverageTrueRange => "avg_true_range",
            WindowMetric::AvgUp => "avg_up",
            WindowMetric::AvgDown => "avg_down",
            WindowMetric::RelativeStrength => "rs",
            WindowMetric::Rsi => "rsi",
            WindowMetric::DmPos => "dm_pos",
            WindowMetric::DmNeg => "dm_neg",
            WindowMetric::DiPos => "di_pos",
            WindowMetric::DiNeg => "di_neg",
            WindowMetric::Dx => "dx",
            WindowMetric::Adx => "adx",
            WindowMetric::LowestLow => "lowest",
            WindowMetric::HighestHigh => "highest",
            WindowMetric::StochasticK => "stochastic",
            WindowMetric::StochasticD => "stochastic_pct",
        }
    }

    pub fn role(&self) -> FeatureRole {
        match self {
            WindowMetric::ForwardPctChange => FeatureRole::Label,
            WindowMetric::AvgUp
            | WindowMetric::AvgDown
            | WindowMetric::RelativeStrength
            | WindowMetric::DmPos
            | WindowMetric::DmNeg
            | WindowMetric::DiPos
            | WindowMetric::DiNeg
            | WindowMetric::Dx
            | WindowMetric::LowestLow
            | WindowMetric::HighestHigh
            | WindowMetric::StochasticK => FeatureRole::Intermediate,
            _ => FeatureRole::Signal,
        }
    }
}

/// Indicator families compared across two windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RatioMetric {
    CloseSma,
    VolumeSma,
    CloseEma,
    Stochastic,
    Rsi,
}

impl RatioMetric {
    pub const ALL: [RatioMetric; 5] = [
        RatioMetric::CloseSma,
        RatioMetric::VolumeSma,
        RatioMetric::CloseEma,
        RatioMetric::Stochastic,
        RatioMetric::Rsi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatioMetric::CloseSma => "close_sma_ratio",
            RatioMetric::VolumeSma => "volume_sma_ratio",
            RatioMetric::CloseEma => "close_ema_ratio",
            RatioMetric::Stochastic => "stochastic_ratio",
            RatioMetric::Rsi => "rsi_ratio",
        }
    }

    /// The single-window indicator this ratio compares
    pub fn source(&self) -> WindowMetric {
        match self {
            RatioMetric::CloseSma => WindowMetric::CloseSma,
            RatioMetric::VolumeSma => WindowMetric::VolumeSma,
            RatioMetric::CloseEma => WindowMetric::CloseEma,
            RatioMetric::Stochastic => WindowMetric::StochasticD,
            RatioMetric::Rsi => WindowMetric::Rsi,
        }
    }

    /// Averages put the long window on top; oscillators put the short one on top
    pub fn long_over_short(&self) -> bool {
        matches!(
            self,
            RatioMetric::CloseSma | RatioMetric::VolumeSma | RatioMetric::CloseEma
        )
    }

    /// (numerator, denominator) windows for a pair
    pub fn orientation(&self, pair: WindowPair) -> (WindowSize, WindowSize) {
        if self.long_over_short() {
            (pair.long, pair.short)
        } else {
            (pair.short, pair.long)
        }
    }
}

/// Identity of one derived column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureKey {
    Bar(BarMetric),
    Window(WindowMetric, WindowSize),
    Ratio(RatioMetric, WindowPair),
}

impl FeatureKey {
    pub fn window(metric: WindowMetric, window: WindowSize) -> Self {
        FeatureKey::Window(metric, window)
    }

    pub fn role(&self) -> FeatureRole {
        match self {
            FeatureKey::Bar(m) => m.role(),
            FeatureKey::Window(m, _) => m.role(),
            FeatureKey::Ratio(..) => FeatureRole::Signal,
        }
    }

    pub fn is_intermediate(&self) -> bool {
        self.role() == FeatureRole::Intermediate
    }

    pub fn is_lookahead(&self) -> bool {
        self.role() == FeatureRole::Label
    }

    /// Every key the indicator calculator and ratio generator produce, in production order
    pub fn catalog(windows: &WindowCatalog) -> Vec<FeatureKey> {
        let mut keys: Vec<FeatureKey> = BarMetric::ALL.iter().map(|&m| FeatureKey::Bar(m)).collect();
        for &w in windows.windows() {
            keys.extend(WindowMetric::ALL.iter().map(|&m| FeatureKey::Window(m, w)));
        }
        for pair in windows.pairs() {
            keys.extend(RatioMetric::ALL.iter().map(|&m| FeatureKey::Ratio(m, pair)));
        }
        keys
    }

    /// Keys that survive pruning, in production order
    pub fn output_catalog(windows: &WindowCatalog) -> Vec<FeatureKey> {
        Self::catalog(windows)
            .into_iter()
            .filter(|k| !k.is_intermediate())
            .collect()
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKey::Bar(m) => write!(f, "{}", m.as_str()),
            FeatureKey::Window(m, w) => write!(f, "{}_{}", m.as_str(), w),
            FeatureKey::Ratio(m, pair) => {
                let (num, den) = m.orientation(*pair);
                write!(f, "{}_{}_{}", m.as_str(), num, den)
            }
        }
    }
}
