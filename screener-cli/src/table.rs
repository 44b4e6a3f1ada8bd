//! Terminal rendering of a report: rounding, market-cap suffixes, failures.

use chrono::{DateTime, Local, Utc};
use screener_core::domain::IndicatorRow;
use screener_runner::{FailureReason, Report, RunOutcome};

/// `$2.50T`, `$310.00B`, `$45.10M`; smaller caps print whole dollars.
pub fn format_market_cap(cap: Option<f64>) -> String {
    match cap {
        None => "N/A".to_string(),
        Some(x) if x >= 1e12 => format!("${:.2}T", x / 1e12),
        Some(x) if x >= 1e9 => format!("${:.2}B", x / 1e9),
        Some(x) if x >= 1e6 => format!("${:.2}M", x / 1e6),
        Some(x) => format!("${x:.0}"),
    }
}

pub fn format_pct(pct: f64) -> String {
    format!("{pct:+.2}%")
}

pub fn format_last_updated(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "never".to_string(),
    }
}

const HEADER: [&str; 9] = [
    "Symbol",
    "Price",
    "Market Cap",
    "52W Low",
    "52W High",
    "% 52W Low",
    "% 52W High",
    "% BB Low",
    "% BB High",
];

fn cells(row: &IndicatorRow) -> [String; 9] {
    [
        row.symbol.clone(),
        format!("{:.2}", row.current_price),
        format_market_cap(row.market_cap),
        format!("{:.2}", row.week52_low),
        format!("{:.2}", row.week52_high),
        format_pct(row.pct_from_52w_low),
        format_pct(row.pct_from_52w_high),
        format_pct(row.pct_from_bb_low),
        format_pct(row.pct_from_bb_high),
    ]
}

/// Fixed-width table: symbol left-aligned, numbers right-aligned.
pub fn render_table(report: &Report) -> String {
    let body: Vec<[String; 9]> = report.rows.iter().map(cells).collect();

    let mut widths = HEADER.map(str::len);
    for row in &body {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let line = |cells: &[&str]| -> String {
        cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                if i == 0 {
                    format!("{cell:<w$}")
                } else {
                    format!("{cell:>w$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let mut out = String::new();
    out.push_str(&line(&HEADER));
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    out.push('\n');
    for row in &body {
        let refs: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&line(&refs));
        out.push('\n');
    }
    out
}

pub fn print_report(report: &Report) {
    println!();
    print!("{}", render_table(report));
    println!();
    println!(
        "Last updated: {}  ({} symbol(s), fingerprint {})",
        format_last_updated(Some(report.generated_at)),
        report.len(),
        &report.fingerprint()[..12]
    );
}

/// What the user can do about the failures in a run, one line per kind.
pub fn failure_hints(outcome: &RunOutcome) -> Vec<&'static str> {
    let mut hints = Vec::new();
    if outcome.failures_with(FailureReason::NotFound).next().is_some() {
        hints.push("Unknown symbols: check the ticker spelling.");
    }
    if outcome.failures_with(FailureReason::FetchError).next().is_some() {
        hints.push("Provider errors are transient: the next refresh retries them.");
    }
    if outcome.failures_with(FailureReason::InsufficientData).next().is_some() {
        hints.push("Too little history: recent listings need 20 trading days.");
    }
    hints
}

pub fn print_failures(outcome: &RunOutcome) {
    if outcome.failures.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("Skipped {} symbol(s):", outcome.failures.len());
    for failure in &outcome.failures {
        eprintln!("  {failure}");
    }
    for hint in failure_hints(outcome) {
        eprintln!("{hint}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use screener_runner::{NoData, SymbolFailure};

    #[test]
    fn market_cap_suffixes() {
        assert_eq!(format_market_cap(Some(2.5e12)), "$2.50T");
        assert_eq!(format_market_cap(Some(3.104e11)), "$310.40B");
        assert_eq!(format_market_cap(Some(4.51e7)), "$45.10M");
        assert_eq!(format_market_cap(Some(950_000.0)), "$950000");
        assert_eq!(format_market_cap(None), "N/A");
    }

    #[test]
    fn percentages_are_signed_two_decimals() {
        assert_eq!(format_pct(25.0), "+25.00%");
        assert_eq!(format_pct(-16.666_666), "-16.67%");
        assert_eq!(format_pct(0.0), "+0.00%");
    }

    #[test]
    fn hints_follow_failure_kinds() {
        let failure = |symbol: &str, reason| SymbolFailure {
            symbol: symbol.into(),
            reason,
            message: String::new(),
        };
        let outcome = RunOutcome {
            report: Err(NoData { attempted: 3 }),
            failures: vec![
                failure("ZZZZ", FailureReason::NotFound),
                failure("ZZZY", FailureReason::NotFound),
                failure("NEW", FailureReason::InsufficientData),
            ],
        };
        let hints = failure_hints(&outcome);
        assert_eq!(hints.len(), 2);
        assert!(hints[0].starts_with("Unknown symbols"));
        assert!(hints[1].starts_with("Too little history"));

        let clean = RunOutcome {
            report: Err(NoData { attempted: 0 }),
            failures: vec![],
        };
        assert!(failure_hints(&clean).is_empty());
    }

    #[test]
    fn never_updated() {
        assert_eq!(format_last_updated(None), "never");
    }

    #[test]
    fn table_has_header_rule_and_rows() {
        let row = IndicatorRow {
            symbol: "XYZ".into(),
            as_of: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            current_price: 100.0,
            market_cap: None,
            week52_low: 80.0,
            week52_high: 120.0,
            pct_from_52w_low: 25.0,
            pct_from_52w_high: -16.666_666_666_666_668,
            sma20: 100.0,
            std20: 0.0,
            bb_low: 100.0,
            bb_high: 100.0,
            pct_from_bb_low: 0.0,
            pct_from_bb_high: 0.0,
        };
        let report = Report::new(vec![row], Utc.with_ymd_and_hms(2024, 6, 3, 20, 0, 0).unwrap());
        let table = render_table(&report);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Symbol"));
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[2].starts_with("XYZ"));
        assert!(lines[2].contains("100.00"));
        assert!(lines[2].contains("N/A"));
        assert!(lines[2].contains("-16.67%"));
        assert_eq!(lines[0].len(), lines[2].len());
    }
}
