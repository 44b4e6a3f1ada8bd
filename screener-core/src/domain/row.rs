//! IndicatorRow — one derived result per successfully processed symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Derived metrics for a single symbol.
///
/// All values are full precision; rounding is left to whoever renders the row.
/// Percentages are signed: a price below a band gives a negative distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub symbol: String,
    /// Date of the bar `current_price` was taken from.
    pub as_of: NaiveDate,
    pub current_price: f64,
    pub market_cap: Option<f64>,
    pub week52_low: f64,
    pub week52_high: f64,
    pub pct_from_52w_low: f64,
    pub pct_from_52w_high: f64,
    pub sma20: f64,
    pub std20: f64,
    pub bb_low: f64,
    pub bb_high: f64,
    pub pct_from_bb_low: f64,
    pub pct_from_bb_high: f64,
}

impl IndicatorRow {
    /// Canonical little-endian bytes of every field, for hashing.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.symbol.len() + 128);
        out.extend_from_slice(self.symbol.as_bytes());
        out.push(0);
        out.extend_from_slice(self.as_of.to_string().as_bytes());
        match self.market_cap {
            Some(cap) => {
                out.push(1);
                out.extend_from_slice(&cap.to_le_bytes());
            }
            None => out.push(0),
        }
        for v in [
            self.current_price,
            self.week52_low,
            self.week52_high,
            self.pct_from_52w_low,
            self.pct_from_52w_high,
            self.sma20,
            self.std20,
            self.bb_low,
            self.bb_high,
            self.pct_from_bb_low,
            self.pct_from_bb_high,
        ] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }
}
