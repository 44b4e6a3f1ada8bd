//! Trailing price range extremes (the 52-week low/high over a one-year series).

use crate::domain::PriceBar;

/// Lowest `low` across the bars. `None` for an empty slice or any non-finite low.
pub fn lowest_low(bars: &[PriceBar]) -> Option<f64> {
    extreme(bars.iter().map(|b| b.low), f64::min)
}

/// Highest `high` across the bars. `None` for an empty slice or any non-finite high.
pub fn highest_high(bars: &[PriceBar]) -> Option<f64> {
    extreme(bars.iter().map(|b| b.high), f64::max)
}

fn extreme(mut values: impl Iterator<Item = f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    let first = values.next().filter(|v| v.is_finite())?;
    values.try_fold(first, |acc, v| v.is_finite().then(|| pick(acc, v)))
}
