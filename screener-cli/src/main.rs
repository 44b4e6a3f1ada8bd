//! Screener CLI — refresh and display the 52-week / Bollinger report.
//!
//! Commands:
//! - `refresh` — fetch every symbol, rebuild the report, replace the snapshot
//! - `show` — print the last good report (builds one on first use)
//! - `symbols` — print how a raw ticker string normalizes

mod table;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use screener_core::data::{normalize, DataSource, SeriesFetcher, SyntheticFetcher, YahooFetcher};
use screener_runner::{
    run, to_csv, to_json, Report, ReportSlot, RunOutcome, RunProgress, ScreenerConfig,
    SnapshotStore, StdoutProgress, TracingProgress,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "screener",
    about = "Stock screener — 52-week range and 20-day Bollinger band distances"
)]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
    Csv,
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Comma-separated tickers, e.g. "AAPL, MSFT". Overrides the config file.
    #[arg(long)]
    symbols: Option<String>,

    /// Path to a TOML config file. Defaults to the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use seeded synthetic data instead of Yahoo Finance.
    #[arg(long, default_value_t = false)]
    offline_synthetic: bool,

    /// Maximum concurrent fetches. Overrides the config file.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Snapshot file holding the last good report.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every symbol and replace the report when at least one succeeds.
    Refresh(SourceArgs),
    /// Print the last good report, building one if none exists yet.
    Show(SourceArgs),
    /// Print the normalized symbol list for a raw ticker string.
    Symbols {
        /// Raw comma-separated input.
        raw: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Refresh(args) => run_refresh(&args),
        Commands::Show(args) => run_show(&args),
        Commands::Symbols { raw } => {
            for symbol in normalize(&raw) {
                println!("{symbol}");
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn default_snapshot_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("screener").join("report.json"))
        .unwrap_or_else(|| PathBuf::from("screener-report.json"))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("screener").join("config.toml"))
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(args: &SourceArgs) -> Result<ScreenerConfig> {
    let mut config = match args.config.clone().or_else(default_config_path) {
        Some(path) => ScreenerConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ScreenerConfig::default(),
    };

    if let Some(symbols) = &args.symbols {
        config.symbols = symbols.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrency = concurrency;
    }
    config.validate().context("invalid settings")?;
    Ok(config)
}

fn make_fetcher(config: &ScreenerConfig, synthetic: bool) -> Result<Box<dyn SeriesFetcher>> {
    if synthetic {
        let today = chrono::Local::now().date_naive();
        return Ok(Box::new(SyntheticFetcher::new(today)));
    }
    let breaker = Arc::new(config.circuit_breaker());
    let fetcher = YahooFetcher::new(breaker, config.yahoo_options())
        .context("creating Yahoo Finance client")?;
    Ok(Box::new(fetcher))
}

fn snapshot_store(args: &SourceArgs) -> SnapshotStore {
    SnapshotStore::new(args.snapshot.clone().unwrap_or_else(default_snapshot_path))
}

/// A slot seeded from the snapshot file, if one exists.
fn restore_slot(store: &SnapshotStore) -> Result<ReportSlot> {
    let restored = store
        .load()
        .with_context(|| format!("reading snapshot {}", store.path().display()))?;
    Ok(match restored {
        Some(report) => ReportSlot::with_report(report),
        None => ReportSlot::new(),
    })
}

fn build_report(
    fetcher: &dyn SeriesFetcher,
    config: &ScreenerConfig,
    format: Format,
) -> RunOutcome {
    if fetcher.source() == DataSource::Synthetic {
        eprintln!("WARNING: building the report from SYNTHETIC data");
    }
    // Progress lines would corrupt machine-readable output.
    let progress: &dyn RunProgress = match format {
        Format::Table => &StdoutProgress,
        Format::Json | Format::Csv => &TracingProgress,
    };
    run(fetcher, &config.symbols, &config.assemble_options(), progress)
}

/// Persist a successful outcome's report. Returns whether the run produced one.
fn persist(outcome: &RunOutcome, store: &SnapshotStore) -> Result<bool> {
    table::print_failures(outcome);
    match &outcome.report {
        Ok(report) => {
            store
                .store(report)
                .with_context(|| format!("writing snapshot {}", store.path().display()))?;
            Ok(true)
        }
        Err(no_data) => {
            eprintln!();
            eprintln!("WARNING: {no_data}. Check your ticker symbols.");
            Ok(false)
        }
    }
}

fn run_refresh(args: &SourceArgs) -> Result<()> {
    let config = load_config(args)?;
    let store = snapshot_store(args);
    let slot = restore_slot(&store)?;
    let fetcher = make_fetcher(&config, args.offline_synthetic)?;

    let outcome = slot.refresh(|| build_report(fetcher.as_ref(), &config, args.format));

    let replaced = persist(&outcome, &store)?;
    match slot.current() {
        Some(report) => emit(&report, args.format)?,
        None => println!("Last updated: {}", table::format_last_updated(None)),
    }

    if !replaced {
        std::process::exit(1);
    }
    Ok(())
}

fn run_show(args: &SourceArgs) -> Result<()> {
    let store = snapshot_store(args);
    let slot = restore_slot(&store)?;

    if slot.is_empty() {
        let config = load_config(args)?;
        let fetcher = make_fetcher(&config, args.offline_synthetic)?;
        tracing::info!("no snapshot yet, running first refresh");
        let first = slot.ensure_loaded(|| build_report(fetcher.as_ref(), &config, args.format));
        if let Some(outcome) = &first {
            persist(outcome, &store)?;
        }
    }

    match slot.current() {
        Some(report) => emit(&report, args.format),
        None => {
            println!("Last updated: {}", table::format_last_updated(None));
            std::process::exit(1);
        }
    }
}

fn emit(report: &Report, format: Format) -> Result<()> {
    match format {
        Format::Table => table::print_report(report),
        Format::Json => println!("{}", to_json(report).context("rendering JSON")?),
        Format::Csv => print!("{}", to_csv(report).context("rendering CSV")?),
    }
    Ok(())
}
