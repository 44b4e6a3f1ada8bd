//! Indicator engine — one symbol's series in, one `IndicatorRow` out.
//!
//! Stateless: the row is a pure function of the series and the engine
//! parameters. Values are returned at full precision.
//!
//! Steps, in order:
//! 1. current price = close of the last bar
//! 2. 52-week low/high = min `low` / max `high` over the whole series
//! 3. percent distance of the current price from each extreme
//! 4. SMA and sample stddev of the last `bb_period` closes
//! 5. Bollinger bounds `sma ± k·std`
//! 6. percent distance of the current price from each bound
//!
//! Any step that would divide by zero, read past the start of the series, or
//! produce a non-finite value fails the symbol with `InsufficientData`
//! instead of emitting a silently wrong number. A negative lower band is a
//! legitimate (if extreme) reference and is accepted.

use crate::domain::{IndicatorRow, SymbolSeries};
use crate::indicators::{highest_high, lowest_low, Bollinger, Indicator, RollingStd, Sma};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Bollinger window and width. Defaults are the classic 20-day, 2-sigma bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    pub bb_period: usize,
    pub bb_multiplier: f64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            bb_period: 20,
            bb_multiplier: 2.0,
        }
    }
}

/// Why a series could not produce a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shortfall {
    EmptySeries,
    TooFewBars { have: usize, need: usize },
    NonFinite(&'static str),
    ZeroDenominator(&'static str),
    /// Engine parameters that cannot define a band (window < 2, width <= 0).
    InvalidParams { bb_period: usize, bb_multiplier: f64 },
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySeries => write!(f, "series is empty"),
            Self::TooFewBars { have, need } => {
                write!(f, "{have} bars, need at least {need} for the Bollinger window")
            }
            Self::NonFinite(what) => write!(f, "{what} is not a finite number"),
            Self::ZeroDenominator(what) => write!(f, "{what} is zero"),
            Self::InvalidParams {
                bb_period,
                bb_multiplier,
            } => write!(
                f,
                "Bollinger window {bb_period} x {bb_multiplier} is not a valid band"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("insufficient data for {symbol}: {shortfall}")]
    InsufficientData { symbol: String, shortfall: Shortfall },
}

impl IndicatorError {
    pub fn shortfall(&self) -> Shortfall {
        match self {
            Self::InsufficientData { shortfall, .. } => *shortfall,
        }
    }
}

/// Relative deviation of `price` from `reference`, in percent.
///
/// `None` when the reference is exactly zero.
pub fn pct_from(price: f64, reference: f64) -> Option<f64> {
    if reference == 0.0 {
        return None;
    }
    Some((price - reference) / reference * 100.0)
}

/// Compute a row with the default 20-day, 2-sigma parameters.
pub fn compute(series: &SymbolSeries) -> Result<IndicatorRow, IndicatorError> {
    compute_with(series, &EngineParams::default())
}

pub fn compute_with(
    series: &SymbolSeries,
    params: &EngineParams,
) -> Result<IndicatorRow, IndicatorError> {
    let fail = |shortfall: Shortfall| IndicatorError::InsufficientData {
        symbol: series.symbol().to_string(),
        shortfall,
    };
    let finite = |v: f64, what: &'static str| {
        if v.is_finite() {
            Ok(v)
        } else {
            Err(fail(Shortfall::NonFinite(what)))
        }
    };

    let width_ok = params.bb_multiplier.is_finite() && params.bb_multiplier > 0.0;
    if params.bb_period < 2 || !width_ok {
        return Err(fail(Shortfall::InvalidParams {
            bb_period: params.bb_period,
            bb_multiplier: params.bb_multiplier,
        }));
    }

    let bars = series.bars();
    let last = series.last().ok_or_else(|| fail(Shortfall::EmptySeries))?;
    let current_price = finite(last.close, "current price")?;

    let week52_low = lowest_low(bars).ok_or_else(|| fail(Shortfall::NonFinite("52-week low")))?;
    let week52_high =
        highest_high(bars).ok_or_else(|| fail(Shortfall::NonFinite("52-week high")))?;
    let pct_from_52w_low = pct_from(current_price, week52_low)
        .ok_or_else(|| fail(Shortfall::ZeroDenominator("52-week low")))?;
    let pct_from_52w_high = pct_from(current_price, week52_high)
        .ok_or_else(|| fail(Shortfall::ZeroDenominator("52-week high")))?;

    let period = params.bb_period;
    if bars.len() < period {
        return Err(fail(Shortfall::TooFewBars {
            have: bars.len(),
            need: period,
        }));
    }
    // Only the trailing window feeds the latest value.
    let window = &bars[bars.len() - period..];

    let sma20 = Sma::new(period)
        .latest(window)
        .ok_or_else(|| fail(Shortfall::NonFinite("moving average")))?;
    let std20 = RollingStd::new(period)
        .latest(window)
        .ok_or_else(|| fail(Shortfall::NonFinite("standard deviation")))?;
    let bb_low = Bollinger::lower(period, params.bb_multiplier)
        .latest(window)
        .ok_or_else(|| fail(Shortfall::NonFinite("lower band")))?;
    let bb_high = Bollinger::upper(period, params.bb_multiplier)
        .latest(window)
        .ok_or_else(|| fail(Shortfall::NonFinite("upper band")))?;

    let pct_from_bb_low = pct_from(current_price, bb_low)
        .ok_or_else(|| fail(Shortfall::ZeroDenominator("lower band")))?;
    let pct_from_bb_high = pct_from(current_price, bb_high)
        .ok_or_else(|| fail(Shortfall::ZeroDenominator("upper band")))?;

    Ok(IndicatorRow {
        symbol: series.symbol().to_string(),
        as_of: last.date,
        current_price,
        market_cap: series.market_cap(),
        week52_low,
        week52_high,
        pct_from_52w_low: finite(pct_from_52w_low, "percent from 52-week low")?,
        pct_from_52w_high: finite(pct_from_52w_high, "percent from 52-week high")?,
        sma20,
        std20,
        bb_low,
        bb_high,
        pct_from_bb_low: finite(pct_from_bb_low, "percent from lower band")?,
        pct_from_bb_high: finite(pct_from_bb_high, "percent from upper band")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceBar;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn series(symbol: &str, bars: Vec<PriceBar>) -> SymbolSeries {
        SymbolSeries::new(symbol, bars, Some(2.0e9))
    }

    /// Flat 100.00 closes with one early bar spanning [80, 120].
    fn xyz_series(len: usize) -> SymbolSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..len)
            .map(|i| {
                let (low, high) = if i == 0 { (80.0, 120.0) } else { (99.0, 101.0) };
                PriceBar {
                    date: start + chrono::Duration::days(i as i64),
                    open: 100.0,
                    high,
                    low,
                    close: 100.0,
                }
            })
            .collect();
        SymbolSeries::new("XYZ", bars, None)
    }

    #[test]
    fn flat_series_worked_example() {
        let row = compute(&xyz_series(30)).unwrap();
        assert_eq!(row.symbol, "XYZ");
        assert_eq!(row.current_price, 100.0);
        assert_eq!(row.week52_low, 80.0);
        assert_eq!(row.week52_high, 120.0);
        assert_approx(row.pct_from_52w_low, 25.0, DEFAULT_EPSILON);
        assert_approx(row.pct_from_52w_high, -16.666_666_666_666_668, 1e-9);
        assert_eq!(row.sma20, 100.0);
        assert_eq!(row.std20, 0.0);
        assert_eq!(row.bb_low, 100.0);
        assert_eq!(row.bb_high, 100.0);
        assert_eq!(row.pct_from_bb_low, 0.0);
        assert_eq!(row.pct_from_bb_high, 0.0);
        assert_eq!(row.market_cap, None);
    }

    #[test]
    fn exactly_twenty_bars_is_enough() {
        assert!(compute(&xyz_series(20)).is_ok());
    }

    #[test]
    fn nineteen_bars_is_insufficient() {
        let err = compute(&xyz_series(19)).unwrap_err();
        assert_eq!(err.shortfall(), Shortfall::TooFewBars { have: 19, need: 20 });
        assert_eq!(
            err.to_string(),
            "insufficient data for XYZ: 19 bars, need at least 20 for the Bollinger window"
        );
    }

    #[test]
    fn empty_series_is_insufficient() {
        let err = compute(&SymbolSeries::new("NONE", vec![], None)).unwrap_err();
        assert_eq!(err.shortfall(), Shortfall::EmptySeries);
    }

    #[test]
    fn zero_low_is_insufficient() {
        let mut bars = make_bars(&[10.0; 25]);
        bars[3].low = 0.0;
        let err = compute(&series("ZERO", bars)).unwrap_err();
        assert_eq!(err.shortfall(), Shortfall::ZeroDenominator("52-week low"));
    }

    #[test]
    fn nan_close_in_window_is_insufficient() {
        let mut bars = make_bars(&(10..35).map(f64::from).collect::<Vec<_>>());
        bars[22].close = f64::NAN;
        let err = compute(&series("NAN", bars)).unwrap_err();
        assert!(matches!(err.shortfall(), Shortfall::NonFinite(_)));
    }

    #[test]
    fn current_price_is_last_close_and_market_cap_passes_through() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + i as f64).collect();
        let row = compute(&series("UP", make_bars(&closes))).unwrap();
        assert_eq!(row.current_price, 89.0);
        assert_eq!(row.market_cap, Some(2.0e9));
        assert!(row.pct_from_52w_high <= 0.0);
        assert!(row.pct_from_52w_low > 0.0);
    }

    #[test]
    fn bands_bracket_the_mean_and_use_last_twenty_closes() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let row = compute(&series("WAVE", make_bars(&closes))).unwrap();

        let tail = &closes[40..];
        let mean = tail.iter().sum::<f64>() / 20.0;
        let var = tail.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / 19.0;
        assert_approx(row.sma20, mean, 1e-9);
        assert_approx(row.std20, var.sqrt(), 1e-9);
        assert!(row.bb_low < row.sma20 && row.sma20 < row.bb_high);
        assert_approx(row.bb_high - row.sma20, 2.0 * row.std20, 1e-9);
        assert_approx(
            row.pct_from_bb_low,
            (row.current_price - row.bb_low) / row.bb_low * 100.0,
            1e-9,
        );
    }

    #[test]
    fn negative_lower_band_is_accepted() {
        // Half the window at 100, half at 2: two sigma is wider than the mean.
        let mut closes = vec![100.0; 10];
        closes.extend([2.0; 10]);
        let row = compute(&series("CRASH", make_bars(&closes))).unwrap();
        assert!(row.bb_low < 0.0);
        assert!(row.pct_from_bb_low.is_finite());
        assert!(row.pct_from_bb_low < 0.0);
    }

    #[test]
    fn custom_window() {
        let params = EngineParams {
            bb_period: 5,
            bb_multiplier: 1.0,
        };
        let row = compute_with(&series("FIVE", make_bars(&[11.0, 12.0, 13.0, 14.0, 15.0])), &params)
            .unwrap();
        assert_approx(row.sma20, 13.0, DEFAULT_EPSILON);
        assert_approx(row.bb_high, 13.0 + 2.5_f64.sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn pct_from_rejects_only_exact_zero() {
        assert_approx(pct_from(110.0, 100.0).unwrap(), 10.0, DEFAULT_EPSILON);
        assert_eq!(pct_from(1.0, 0.0), None);
        assert!(pct_from(1.0, -2.0).unwrap() < 0.0);
    }

    #[test]
    fn degenerate_params_fail_instead_of_panicking() {
        let bars = series("BAD", make_bars(&[11.0; 30]));
        for (bb_period, bb_multiplier) in [(0, 2.0), (1, 2.0), (20, 0.0), (20, f64::NAN)] {
            let params = EngineParams {
                bb_period,
                bb_multiplier,
            };
            let err = compute_with(&bars, &params).unwrap_err();
            assert!(matches!(err.shortfall(), Shortfall::InvalidParams { .. }));
        }
    }
}
