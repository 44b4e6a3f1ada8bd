//! Symbol normalization — free-text ticker input to canonical symbols.
//!
//! Canonical form is trimmed and upper-cased. The normalizer never fails:
//! blank entries are dropped and an all-blank input yields no symbols.

use std::collections::HashSet;

/// Split a comma-separated ticker list into canonical symbols, in input order.
///
/// Duplicates are kept; use [`dedup_symbols`] to collapse them.
pub fn normalize(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// Keep the first occurrence of each symbol, preserving order.
pub fn dedup_symbols(symbols: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(symbols.len());
    symbols
        .iter()
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect()
}
