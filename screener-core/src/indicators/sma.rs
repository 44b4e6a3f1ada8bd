//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

/// Arithmetic mean of a window; NaN if the window is empty or contains NaN.
///
/// Summed as offsets from the first value, so a constant window averages to
/// exactly that value and its deviations are exactly zero.
pub(crate) fn mean(window: &[f64]) -> f64 {
    let Some(&pivot) = window.first() else {
        return f64::NAN;
    };
    pivot + window.iter().map(|v| v - pivot).sum::<f64>() / window.len() as f64
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        // Each window is summed from scratch so a NaN close only taints the
        // windows that contain it and float drift never accumulates.
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        for (i, window) in closes.windows(self.period).enumerate() {
            result[i + self.period - 1] = mean(window);
        }

        result
    }
}
