//! Symbol input and series providers

pub mod circuit_breaker;
pub mod provider;
pub mod symbols;
pub mod synthetic;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use provider::{DataSource, FetchFailure, SeriesFetcher, StaticFetcher};
pub use symbols::{dedup_symbols, normalize};
pub use synthetic::SyntheticFetcher;
pub use yahoo::{YahooFetcher, YahooOptions};
