//! Report types: the ordered row table, per-symbol failures, and run outcome.

use chrono::{DateTime, Utc};
use screener_core::data::FetchFailure;
use screener_core::domain::IndicatorRow;
use screener_core::IndicatorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Rows for every symbol that succeeded, in input order, plus when they were built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<IndicatorRow>,
}

impl Report {
    pub fn new(rows: Vec<IndicatorRow>, generated_at: DateTime<Utc>) -> Self {
        Self { generated_at, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.symbol.as_str()).collect()
    }

    /// BLAKE3 over the rows in order. Independent of `generated_at`, so two runs
    /// over unchanged data have the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for row in &self.rows {
            hasher.update(&row.canonical_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Failure taxonomy surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// The provider does not know the symbol. Fix the input.
    NotFound,
    /// Transient provider or network problem. Retry on the next refresh.
    FetchError,
    /// Series too short or numerically degenerate.
    InsufficientData,
}

impl FailureReason {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::FetchError)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::FetchError => "fetch error",
            Self::InsufficientData => "insufficient data",
        };
        f.write_str(label)
    }
}

/// One symbol that produced no row, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: FailureReason,
    pub message: String,
}

impl SymbolFailure {
    pub fn from_fetch(symbol: &str, failure: &FetchFailure) -> Self {
        let reason = if failure.is_not_found() {
            FailureReason::NotFound
        } else {
            FailureReason::FetchError
        };
        Self {
            symbol: symbol.to_string(),
            reason,
            message: failure.to_string(),
        }
    }

    pub fn from_indicator(symbol: &str, error: &IndicatorError) -> Self {
        Self {
            symbol: symbol.to_string(),
            reason: FailureReason::InsufficientData,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for SymbolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.symbol, self.reason, self.message)
    }
}

/// A run where no symbol produced a row.
///
/// Distinct from an empty report so the caller keeps whatever it held before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no valid data: none of the {attempted} symbol(s) produced a row")]
pub struct NoData {
    pub attempted: usize,
}

/// Everything a run returns: the report (or `NoData`) and every per-symbol failure.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Result<Report, NoData>,
    pub failures: Vec<SymbolFailure>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_ok()
    }

    pub fn failures_with(&self, reason: FailureReason) -> impl Iterator<Item = &SymbolFailure> {
        self.failures.iter().filter(move |f| f.reason == reason)
    }
}
