//! Report assembly — symbols in, ordered rows and per-symbol failures out.
//!
//! Each symbol runs `fetch → compute` on its own; nothing is shared between
//! symbols except the fetcher. A failure is recorded and the batch moves on.
//! Rows come back in input order whether the batch ran sequentially or on a
//! bounded worker pool.
//!
//! The assembler never touches a report store. Deciding whether to replace a
//! previously held report is the caller's job (see `slot::ReportSlot`).

use chrono::Utc;
use rayon::prelude::*;
use screener_core::data::{dedup_symbols, normalize, SeriesFetcher};
use screener_core::domain::IndicatorRow;
use screener_core::{compute_with, EngineParams};

use crate::report::{FailureReason, NoData, Report, RunOutcome, SymbolFailure};

/// Knobs for one assembly run.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Upper bound on concurrent fetches. `1` runs strictly sequentially.
    pub max_concurrency: usize,
    /// Collapse repeated symbols to their first occurrence before fetching.
    pub dedup_symbols: bool,
    pub engine: EngineParams,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            dedup_symbols: true,
            engine: EngineParams::default(),
        }
    }
}

/// Progress callback for multi-symbol runs.
///
/// Called from worker threads when the run is parallel, so `index` (the
/// symbol's input position) is the only ordering guarantee.
pub trait RunProgress: Send + Sync {
    /// Called when starting to fetch a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol finishes, successfully or not.
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: &Result<(), SymbolFailure>,
    );

    /// Called once after every symbol has finished.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl RunProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<(), SymbolFailure>,
    ) {
        match result {
            Ok(()) => println!("  OK: {symbol}"),
            Err(f) => println!("  FAIL: {symbol}: {} ({})", f.reason, f.message),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nRefresh complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Progress reporter that only emits tracing events.
pub struct TracingProgress;

impl RunProgress for TracingProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::debug!(symbol, index, total, "fetching");
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<(), SymbolFailure>,
    ) {
        match result {
            Ok(()) => tracing::debug!(symbol, "symbol done"),
            Err(f) => {
                tracing::warn!(symbol, reason = %f.reason, message = %f.message, "symbol failed")
            }
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!(succeeded, failed, total, "refresh complete");
    }
}

/// Normalize a raw ticker string and build a report from it.
pub fn run(
    fetcher: &dyn SeriesFetcher,
    raw_symbols: &str,
    opts: &AssembleOptions,
    progress: &dyn RunProgress,
) -> RunOutcome {
    build(fetcher, &normalize(raw_symbols), opts, progress)
}

/// Build a report for `symbols`, in order.
///
/// Returns `Err(NoData)` in the outcome when no symbol produced a row,
/// including when `symbols` is empty.
pub fn build(
    fetcher: &dyn SeriesFetcher,
    symbols: &[String],
    opts: &AssembleOptions,
    progress: &dyn RunProgress,
) -> RunOutcome {
    let symbols = if opts.dedup_symbols {
        dedup_symbols(symbols)
    } else {
        symbols.to_vec()
    };
    let total = symbols.len();
    tracing::info!(
        total,
        provider = fetcher.name(),
        source = ?fetcher.source(),
        concurrency = opts.max_concurrency,
        "building report"
    );

    let run_one = |(index, symbol): (usize, &String)| {
        progress.on_start(symbol, index, total);
        let result = process_symbol(fetcher, symbol, &opts.engine);
        let status = result.as_ref().map(|_| ()).map_err(|f| f.clone());
        progress.on_complete(symbol, index, total, &status);
        result
    };

    let results: Vec<Result<IndicatorRow, SymbolFailure>> = if opts.max_concurrency > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(opts.max_concurrency)
            .thread_name(|i| format!("screener-fetch-{i}"))
            .build()
        {
            // Indexed collect keeps input order regardless of completion order.
            Ok(pool) => pool.install(|| symbols.par_iter().enumerate().map(&run_one).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "worker pool unavailable, running sequentially");
                symbols.iter().enumerate().map(&run_one).collect()
            }
        }
    } else {
        symbols.iter().enumerate().map(&run_one).collect()
    };

    let mut rows = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(row) => rows.push(row),
            Err(failure) => failures.push(failure),
        }
    }

    progress.on_batch_complete(rows.len(), failures.len(), total);

    let report = if rows.is_empty() {
        Err(NoData { attempted: total })
    } else {
        Ok(Report::new(rows, Utc::now()))
    };

    RunOutcome { report, failures }
}

/// Fetching → Fetched → Computing → Done, or the failure that stopped it.
fn process_symbol(
    fetcher: &dyn SeriesFetcher,
    symbol: &str,
    params: &EngineParams,
) -> Result<IndicatorRow, SymbolFailure> {
    if !fetcher.is_available() {
        let mut message = format!("{} is not accepting requests right now", fetcher.name());
        if let Some(wait) = fetcher.retry_after() {
            message.push_str(&format!(", retry in {}s", wait.as_secs().max(1)));
        }
        return Err(SymbolFailure {
            symbol: symbol.to_string(),
            reason: FailureReason::FetchError,
            message,
        });
    }

    let series = fetcher
        .fetch(symbol)
        .map_err(|e| SymbolFailure::from_fetch(symbol, &e))?;

    compute_with(&series, params).map_err(|e| SymbolFailure::from_indicator(symbol, &e))
}
