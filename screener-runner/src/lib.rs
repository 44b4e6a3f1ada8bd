//! Screener Runner — report assembly and everything around a finished report.
//!
//! This crate builds on `screener-core` to provide:
//! - The report assembler (normalize, fetch, compute, collect failures)
//! - Report, failure and run-outcome types with a deterministic fingerprint
//! - A report slot with atomic replace-on-success and `last_updated`
//! - JSON snapshot persistence of the last good report
//! - TOML configuration and CSV/JSON export

pub mod assembler;
pub mod config;
pub mod export;
pub mod report;
pub mod slot;
pub mod snapshot;

pub use assembler::{build, run, AssembleOptions, RunProgress, StdoutProgress, TracingProgress};
pub use config::{ConfigError, ProviderConfig, ScreenerConfig, DEFAULT_SYMBOLS};
pub use export::{to_csv, to_json, ExportError};
pub use report::{FailureReason, NoData, Report, RunOutcome, SymbolFailure};
pub use slot::ReportSlot;
pub use snapshot::{SnapshotError, SnapshotStore};
