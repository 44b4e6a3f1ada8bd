//! Domain types for the screener

pub mod bar;
pub mod row;

pub use bar::{PriceBar, SymbolSeries};
pub use row::IndicatorRow;
