//! Series fetcher trait and structured fetch failures.
//!
//! The SeriesFetcher trait abstracts over data sources (Yahoo Finance, synthetic,
//! in-memory) so the assembler can swap implementations and tests can mock them.

use crate::domain::SymbolSeries;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Structured failures from a fetch.
///
/// `NotFound` means the provider has no data for the symbol and retrying will not
/// help until the input is corrected. Every other variant is a transient provider
/// or network problem that a later refresh may get past.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchFailure {
    #[error("symbol not found: {symbol}")]
    NotFound { symbol: String },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("provider error: {0}")]
    Other(String),
}

impl FetchFailure {
    pub fn not_found(symbol: impl Into<String>) -> Self {
        Self::NotFound {
            symbol: symbol.into(),
        }
    }

    /// True for the non-retryable "provider has no such symbol" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Synthetic,
    Memory,
}

/// Trait for series providers.
///
/// Implementations return roughly one trailing year of daily bars for a canonical
/// symbol. Callers must not assume an exact bar count.
pub trait SeriesFetcher: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Which data source this provider represents.
    fn source(&self) -> DataSource;

    /// Fetch the trailing-year series and reference data for a symbol.
    fn fetch(&self, symbol: &str) -> Result<SymbolSeries, FetchFailure>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }

    /// How long until an unavailable provider accepts requests again, if known.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// In-memory fetcher: a fixed answer per symbol.
///
/// Symbols without an entry are reported as `NotFound`.
#[derive(Debug, Default, Clone)]
pub struct StaticFetcher {
    entries: HashMap<String, Result<SymbolSeries, FetchFailure>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series under its own symbol.
    pub fn with_series(mut self, series: SymbolSeries) -> Self {
        self.entries.insert(series.symbol().to_string(), Ok(series));
        self
    }

    /// Register a failure for a symbol.
    pub fn with_failure(mut self, symbol: impl Into<String>, failure: FetchFailure) -> Self {
        self.entries.insert(symbol.into(), Err(failure));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SeriesFetcher for StaticFetcher {
    fn name(&self) -> &str {
        "memory"
    }

    fn source(&self) -> DataSource {
        DataSource::Memory
    }

    fn fetch(&self, symbol: &str) -> Result<SymbolSeries, FetchFailure> {
        self.entries
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Err(FetchFailure::not_found(symbol)))
    }
}
