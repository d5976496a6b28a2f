//! Window primitives for indicator computation
//!
//! Each primitive can be driven one value at a time with `update` or over a whole
//! column with `compute`, which returns a vector aligned with its input. Undefined
//! positions are `f64::NAN`:
//!
//! - rolling statistics are undefined until `window` values have been seen and
//!   whenever any value inside the window is undefined;
//! - half-life averages are undefined only before the first defined input.

use std::collections::VecDeque;

/// Length of the trailing run of identical finite values
#[derive(Debug, Clone, Copy)]
struct EqualRun {
    value: f64,
    len: usize,
}

impl EqualRun {
    fn new() -> Self {
        Self { value: f64::NAN, len: 0 }
    }

    fn push(&mut self, value: f64) {
        if !value.is_finite() {
            self.len = 0;
        } else if value == self.value && self.len > 0 {
            self.len += 1;
        } else {
            self.value = value;
            self.len = 1;
        }
    }

    /// Whether the last `window` values were all the same
    fn covers(&self, window: usize) -> bool {
        self.len >= window
    }
}

/// Rolling arithmetic mean over a fixed window
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: usize,
    values: VecDeque<f64>,
    // compensated sum of the finite values in the window
    sum: f64,
    compensation: f64,
    nan_count: usize,
    pos_inf: usize,
    neg_inf: usize,
    negatives: usize,
    run: EqualRun,
}

impl RollingMean {
    /// Create new rolling mean with given window size
    pub fn new(window: usize) -> Self {
        if window == 0 {
            panic!("Window size must be greater than 0");
        }
        Self {
            window,
            values: VecDeque::with_capacity(window + 1),
            sum: 0.0,
            compensation: 0.0,
            nan_count: 0,
            pos_inf: 0,
            neg_inf: 0,
            negatives: 0,
            run: EqualRun::new(),
        }
    }

    fn add_finite(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    fn account(&mut self, value: f64, entering: bool) {
        if value.is_nan() {
            if entering {
                self.nan_count += 1;
            } else {
                self.nan_count -= 1;
            }
        } else if value == f64::INFINITY {
            if entering {
                self.pos_inf += 1;
            } else {
                self.pos_inf -= 1;
            }
        } else if value == f64::NEG_INFINITY {
            if entering {
                self.neg_inf += 1;
            } else {
                self.neg_inf -= 1;
            }
        } else {
            if value < 0.0 {
                if entering {
                    self.negatives += 1;
                } else {
                    self.negatives -= 1;
                }
            }
            self.add_finite(if entering { value } else { -value });
        }
    }

    /// Add a value and return the current mean
    pub fn update(&mut self, value: f64) -> f64 {
        self.values.push_back(value);
        self.account(value, true);
        self.run.push(value);

        if self.values.len() > self.window {
            if let Some(old) = self.values.pop_front() {
                self.account(old, false);
            }
        }

        self.current()
    }

    /// Current mean (NaN until the window is full of defined values)
    pub fn current(&self) -> f64 {
        if self.values.len() < self.window || self.nan_count > 0 {
            return f64::NAN;
        }
        match (self.pos_inf > 0, self.neg_inf > 0) {
            (true, true) => f64::NAN,
            (true, false) => f64::INFINITY,
            (false, true) => f64::NEG_INFINITY,
            (false, false) if self.run.covers(self.window) => self.run.value,
            (false, false) => {
                let mean = self.sum / self.window as f64;
                // residue of removed values must not flip the sign
                if self.negatives == 0 && mean < 0.0 {
                    0.0
                } else {
                    mean
                }
            }
        }
    }

    /// Compute rolling mean for a slice of values
    pub fn compute(window: usize, values: &[f64]) -> Vec<f64> {
        let mut mean = Self::new(window);
        values.iter().map(|&v| mean.update(v)).collect()
    }
}

/// Rolling sample standard deviation (n - 1 denominator)
#[derive(Debug, Clone)]
pub struct RollingStdDev {
    window: usize,
    values: VecDeque<f64>,
    // online moments of the finite values in the window
    nobs: usize,
    mean: f64,
    ssqdm: f64,
    non_finite: usize,
    run: EqualRun,
}

impl RollingStdDev {
    /// Create new rolling standard deviation with given window size
    pub fn new(window: usize) -> Self {
        if window == 0 {
            panic!("Window size must be greater than 0");
        }
        Self {
            window,
            values: VecDeque::with_capacity(window + 1),
            nobs: 0,
            mean: 0.0,
            ssqdm: 0.0,
            non_finite: 0,
            run: EqualRun::new(),
        }
    }

    fn add(&mut self, value: f64) {
        if !value.is_finite() {
            self.non_finite += 1;
            return;
        }
        self.nobs += 1;
        let n = self.nobs as f64;
        let delta = value - self.mean;
        self.mean += delta / n;
        self.ssqdm += (n - 1.0) * delta * delta / n;
    }

    fn remove(&mut self, value: f64) {
        if !value.is_finite() {
            self.non_finite -= 1;
            return;
        }
        self.nobs -= 1;
        if self.nobs == 0 {
            self.mean = 0.0;
            self.ssqdm = 0.0;
            return;
        }
        let n = self.nobs as f64;
        let delta = value - self.mean;
        self.mean -= delta / n;
        self.ssqdm -= (n + 1.0) * delta * delta / n;
    }

    /// Add a value and return the current standard deviation
    pub fn update(&mut self, value: f64) -> f64 {
        self.values.push_back(value);
        self.add(value);
        self.run.push(value);

        if self.values.len() > self.window {
            if let Some(old) = self.values.pop_front() {
                self.remove(old);
            }
        }

        // a window of identical values has exact moments; drop accumulated drift
        if self.run.covers(self.window) {
            self.mean = self.run.value;
            self.ssqdm = 0.0;
        }

        self.current()
    }

    pub fn current(&self) -> f64 {
        if self.window < 2 || self.values.len() < self.window || self.non_finite > 0 {
            return f64::NAN;
        }
        if self.run.covers(self.window) {
            return 0.0;
        }
        (self.ssqdm.max(0.0) / (self.nobs - 1) as f64).sqrt()
    }

    /// Compute rolling standard deviation for a slice of values
    pub fn compute(window: usize, values: &[f64]) -> Vec<f64> {
        let mut std = Self::new(window);
        values.iter().map(|&v| std.update(v)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Min,
    Max,
}

/// Rolling minimum or maximum (monotonic deque)
#[derive(Debug, Clone)]
pub struct RollingExtremum {
    window: usize,
    kind: Extreme,
    values: VecDeque<f64>,
    candidates: VecDeque<(usize, f64)>,
    seen: usize,
    nan_count: usize,
}

impl RollingExtremum {
    fn new(window: usize, kind: Extreme) -> Self {
        if window == 0 {
            panic!("Window size must be greater than 0");
        }
        Self {
            window,
            kind,
            values: VecDeque::with_capacity(window + 1),
            candidates: VecDeque::new(),
            seen: 0,
            nan_count: 0,
        }
    }

    /// Rolling minimum
    pub fn min(window: usize) -> Self {
        Self::new(window, Extreme::Min)
    }

    /// Rolling maximum
    pub fn max(window: usize) -> Self {
        Self::new(window, Extreme::Max)
    }

    fn dominates(&self, incoming: f64, existing: f64) -> bool {
        match self.kind {
            Extreme::Min => incoming <= existing,
            Extreme::Max => incoming >= existing,
        }
    }

    pub fn update(&mut self, value: f64) -> f64 {
        let index = self.seen;
        self.seen += 1;

        self.values.push_back(value);
        if value.is_nan() {
            self.nan_count += 1;
        } else {
            while let Some(&(_, back)) = self.candidates.back() {
                if self.dominates(value, back) {
                    self.candidates.pop_back();
                } else {
                    break;
                }
            }
            self.candidates.push_back((index, value));
        }

        if self.values.len() > self.window {
            if let Some(old) = self.values.pop_front() {
                if old.is_nan() {
                    self.nan_count -= 1;
                }
            }
            let expired = index - self.window;
            while matches!(self.candidates.front(), Some(&(i, _)) if i <= expired) {
                self.candidates.pop_front();
            }
        }

        if self.values.len() < self.window || self.nan_count > 0 {
            return f64::NAN;
        }
        self.candidates.front().map_or(f64::NAN, |&(_, v)| v)
    }

    /// Compute rolling minimum for a slice of values
    pub fn compute_min(window: usize, values: &[f64]) -> Vec<f64> {
        let mut min = Self::min(window);
        values.iter().map(|&v| min.update(v)).collect()
    }

    /// Compute rolling maximum for a slice of values
    pub fn compute_max(window: usize, values: &[f64]) -> Vec<f64> {
        let mut max = Self::max(window);
        values.iter().map(|&v| max.update(v)).collect()
    }
}

/// Exponentially weighted mean parameterized by half-life
///
/// Uses the bias-adjusted form: the value at `t` is the weighted mean of all
/// earlier defined inputs with weight `(1 - alpha)^age`, where
/// `alpha = 1 - exp(-ln 2 / half_life)`. An undefined input ages the existing
/// weights without contributing, so a gap still discounts older observations.
#[derive(Debug, Clone)]
pub struct HalfLifeEwm {
    decay: f64,
    weighted: f64,
    old_weight: f64,
    started: bool,
}

impl HalfLifeEwm {
    /// Create new EWM with given half-life (in bars)
    pub fn new(half_life: usize) -> Self {
        if half_life == 0 {
            panic!("Half-life must be greater than 0");
        }
        let alpha = 1.0 - (-std::f64::consts::LN_2 / half_life as f64).exp();
        Self {
            decay: 1.0 - alpha,
            weighted: f64::NAN,
            old_weight: 1.0,
            started: false,
        }
    }

    /// Smoothing factor alpha
    pub fn alpha(&self) -> f64 {
        1.0 - self.decay
    }

    /// Update with new value
    pub fn update(&mut self, value: f64) -> f64 {
        if !self.started {
            self.started = true;
            self.weighted = value;
            return self.weighted;
        }

        let observed = !value.is_nan();
        if !self.weighted.is_nan() {
            self.old_weight *= self.decay;
            if observed {
                // constant input keeps the mean exact
                if self.weighted != value {
                    self.weighted = (self.old_weight * self.weighted + value) / (self.old_weight + 1.0);
                }
                self.old_weight += 1.0;
            }
        } else if observed {
            self.weighted = value;
        }
        self.weighted
    }

    /// Compute EWM for a slice of values
    pub fn compute(half_life: usize, values: &[f64]) -> Vec<f64> {
        let mut ewm = Self::new(half_life);
        values.iter().map(|&v| ewm.update(v)).collect()
    }
}

/// `values[t - periods]`, undefined before the start
pub fn lag(values: &[f64], periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| if t >= periods { values[t - periods] } else { f64::NAN })
        .collect()
}

/// `values[t + periods]`, undefined past the end (looks ahead)
pub fn lead(values: &[f64], periods: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| values.get(t + periods).copied().unwrap_or(f64::NAN))
        .collect()
}

/// Element-wise `a / b` with IEEE semantics (x/0 = ±inf, 0/0 = NaN)
pub fn divide(numerator: &[f64], denominator: &[f64]) -> Vec<f64> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| n / d)
        .collect()
}

/// Element-wise combination of two aligned columns
pub fn zip_with(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use statrs::statistics::Statistics;

    #[test]
    fn test_rolling_mean() {
        let mut mean = RollingMean::new(3);

        assert!(mean.update(1.0).is_nan());
        assert!(mean.update(2.0).is_nan());
        assert_eq!(mean.update(3.0), 2.0); // (1+2+3)/3
        assert_eq!(mean.update(4.0), 3.0); // (2+3+4)/3
    }

    #[test]
    fn test_rolling_mean_nan_blocks_window() {
        let result = RollingMean::compute(2, &[1.0, f64::NAN, 3.0, 5.0]);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert_eq!(result[3], 4.0);
    }

    #[test]
    fn test_rolling_mean_recovers_after_infinity() {
        let result = RollingMean::compute(2, &[1.0, f64::INFINITY, 3.0, 5.0]);
        assert_eq!(result[1], f64::INFINITY);
        assert_eq!(result[2], f64::INFINITY);
        assert_eq!(result[3], 4.0);
    }

    #[test]
    fn test_rolling_std_matches_sample_std() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 + ((i * 7) % 11) as f64 * 0.25).collect();
        let result = RollingStdDev::compute(10, &values);

        for t in 9..values.len() {
            let expected = values[t - 9..=t].iter().std_dev();
            assert_relative_eq!(result[t], expected, epsilon = 1e-9);
        }
        assert!(result[8].is_nan());
    }

    #[test]
    fn test_rolling_std_constant_is_zero() {
        let result = RollingStdDev::compute(3, &[5.0; 6]);
        assert_eq!(result[5], 0.0);
    }

    fn volatile_then_flat(flat: f64) -> Vec<f64> {
        let mut values: Vec<f64> = (0..40)
            .map(|i| 1e4 * ((i as f64) * 1.7).sin() + 123.456 * (i % 5) as f64)
            .collect();
        values.extend(std::iter::repeat(flat).take(12));
        values
    }

    #[test]
    fn test_rolling_mean_exact_on_flat_stretch() {
        let values = volatile_then_flat(100.2);
        let result = RollingMean::compute(5, &values);
        for &v in &result[44..] {
            assert_eq!(v, 100.2);
        }
    }

    #[test]
    fn test_rolling_std_exact_zero_on_flat_stretch() {
        let values = volatile_then_flat(100.2);
        let result = RollingStdDev::compute(5, &values);
        for &v in &result[44..] {
            assert_eq!(v, 0.0);
        }
        // moments restart from the flat state once volatility returns
        let mut std = RollingStdDev::new(5);
        for &v in &values {
            std.update(v);
        }
        std.update(101.2);
        let expected = [100.2, 100.2, 100.2, 100.2, 101.2].iter().std_dev();
        assert_relative_eq!(std.current(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_mean_of_zero_moves_is_zero() {
        let mut moves: Vec<f64> = (0..60).map(|i| ((i * 37) % 11) as f64 * 0.013).collect();
        moves.extend([0.0; 8]);
        let mean = RollingMean::compute(5, &moves);
        for &v in &mean[64..] {
            assert_eq!(v, 0.0);
            assert!(v.is_sign_positive());
        }
        for &v in &mean[4..] {
            assert!(v >= 0.0);
        }
    }

    #[test]
    fn test_rolling_std_window_one_undefined() {
        let result = RollingStdDev::compute(1, &[1.0, 2.0]);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rolling_extremes() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let min = RollingExtremum::compute_min(3, &values);
        let max = RollingExtremum::compute_max(3, &values);

        assert!(min[1].is_nan());
        assert_eq!(&min[2..], &[1.0, 1.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(&max[2..], &[4.0, 4.0, 5.0, 9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_rolling_extreme_nan_in_window() {
        let max = RollingExtremum::compute_max(2, &[1.0, f64::NAN, 2.0, 3.0]);
        assert!(max[1].is_nan());
        assert!(max[2].is_nan());
        assert_eq!(max[3], 3.0);
    }

    #[test]
    fn test_half_life_alpha() {
        let ewm = HalfLifeEwm::new(1);
        assert_relative_eq!(ewm.alpha(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_half_life_ewm_adjusted_weights() {
        // half-life 1 => decay 0.5
        let result = HalfLifeEwm::compute(1, &[1.0, 2.0, 3.0]);
        assert_eq!(result[0], 1.0);
        assert_relative_eq!(result[1], (0.5 * 1.0 + 2.0) / 1.5, epsilon = 1e-12);
        assert_relative_eq!(result[2], (0.25 * 1.0 + 0.5 * 2.0 + 3.0) / 1.75, epsilon = 1e-12);
    }

    #[test]
    fn test_half_life_ewm_skips_leading_nan() {
        let result = HalfLifeEwm::compute(1, &[f64::NAN, 4.0, f64::NAN, 1.0]);
        assert!(result[0].is_nan());
        assert_eq!(result[1], 4.0);
        assert_eq!(result[2], 4.0);
        // the gap ages the 4.0 observation by two steps
        assert_relative_eq!(result[3], (0.25 * 4.0 + 1.0) / 1.25, epsilon = 1e-12);
    }

    #[test]
    fn test_lag_and_lead() {
        let values = [1.0, 2.0, 3.0];
        let lagged = lag(&values, 1);
        let led = lead(&values, 2);
        assert!(lagged[0].is_nan());
        assert_eq!(&lagged[1..], &[1.0, 2.0]);
        assert_eq!(led[0], 3.0);
        assert!(led[1].is_nan() && led[2].is_nan());
    }

    #[test]
    fn test_divide_ieee() {
        let out = divide(&[1.0, 0.0, -1.0], &[0.0, 0.0, 2.0]);
        assert_eq!(out[0], f64::INFINITY);
        assert!(out[1].is_nan());
        assert_eq!(out[2], -0.5);
    }
}
