//! Price bars and per-symbol series — the fundamental market data units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLC bar for a single symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: positive prices, high >= low, open/close inside the range.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
    }
}

/// One symbol's chronologically ordered bars plus static reference data.
///
/// Bars are kept sorted ascending by date with at most one bar per date.
/// `market_cap` is `None` when the provider did not report one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSeries {
    symbol: String,
    bars: Vec<PriceBar>,
    market_cap: Option<f64>,
}

impl SymbolSeries {
    /// Build a series, sorting bars by date and keeping the last bar seen for a duplicated date.
    pub fn new(
        symbol: impl Into<String>,
        mut bars: Vec<PriceBar>,
        market_cap: Option<f64>,
    ) -> Self {
        bars.sort_by_key(|b| b.date);
        let mut ordered: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match ordered.last_mut() {
                Some(prev) if prev.date == bar.date => *prev = bar,
                _ => ordered.push(bar),
            }
        }

        Self {
            symbol: symbol.into(),
            bars: ordered,
            market_cap: market_cap.filter(|v| v.is_finite()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn market_cap(&self) -> Option<f64> {
        self.market_cap
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The chronologically last bar, if any.
    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }
}
