//! Rolling sample standard deviation of closes.
//!
//! Uses the N-1 (Bessel-corrected) denominator, the conventional rolling
//! statistics definition. Lookback: period - 1.

use super::sma::mean;
use super::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone)]
pub struct RollingStd {
    period: usize,
    name: String,
}

impl RollingStd {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "sample stddev period must be >= 2");
        Self {
            period,
            name: format!("std_{period}"),
        }
    }
}

/// Sample standard deviation (N-1) of a window. NaN for fewer than two values.
pub(crate) fn sample_std(window: &[f64]) -> f64 {
    if window.len() < 2 {
        return f64::NAN;
    }
    let m = mean(window);
    let ss: f64 = window.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (window.len() - 1) as f64).sqrt()
}

impl Indicator for RollingStd {
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

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        for (i, window) in closes.windows(self.period).enumerate() {
            result[i + self.period - 1] = sample_std(window);
        }
        result
    }
}
