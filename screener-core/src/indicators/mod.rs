//! Rolling indicator series.
//!
//! Indicators are pure functions: bar history in, numeric series out, one value
//! per bar. The first `lookback()` values are `f64::NAN` (warmup). The metrics
//! engine reads the last value of each series.
//!
//! Multi-series indicators (Bollinger) are exposed as separate named instances
//! per band, keeping the single-series `Indicator` trait unchanged.

pub mod bollinger;
pub mod range;
pub mod sma;
pub mod stddev;

pub use bollinger::{Bollinger, BollingerBand};
pub use range::{highest_high, lowest_low};
pub use sma::Sma;
pub use stddev::RollingStd;

use crate::domain::PriceBar;

/// A bar-series indicator.
///
/// No value at bar t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20").
    fn name(&self) -> &str;

    /// Number of bars before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;

    /// Value at the last bar, or `None` during warmup or on NaN input.
    fn latest(&self, bars: &[PriceBar]) -> Option<f64> {
        self.compute(bars).last().copied().filter(|v| v.is_finite())
    }
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLC: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
