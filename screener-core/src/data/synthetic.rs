//! Synthetic series fetcher for offline use.
//!
//! Produces a seeded random walk per symbol: the same symbol and end date always
//! yield the same bars, so reports built on synthetic data are reproducible.
//! These are clearly fake and tagged `DataSource::Synthetic`.

use super::provider::{DataSource, FetchFailure, SeriesFetcher};
use crate::domain::{PriceBar, SymbolSeries};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct SyntheticFetcher {
    end: NaiveDate,
    lookback_days: i64,
}

impl SyntheticFetcher {
    /// Series ending at `end` (inclusive) and covering one calendar year.
    pub fn new(end: NaiveDate) -> Self {
        Self {
            end,
            lookback_days: 365,
        }
    }

    fn seed(symbol: &str) -> u64 {
        // FNV-1a
        symbol.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
            (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        })
    }

    fn generate(&self, symbol: &str) -> SymbolSeries {
        let mut rng = StdRng::seed_from_u64(Self::seed(symbol));

        let mut bars = Vec::with_capacity(260);
        let mut price: f64 = rng.gen_range(20.0..500.0);
        let mut current = self.end - chrono::Duration::days(self.lookback_days);

        while current <= self.end {
            // Skip weekends (simple heuristic)
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                current += chrono::Duration::days(1);
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));

            bars.push(PriceBar {
                date: current,
                open,
                high,
                low,
                close,
            });

            price = close;
            current += chrono::Duration::days(1);
        }

        let market_cap = price * rng.gen_range(1.0e7..1.0e10);
        SymbolSeries::new(symbol, bars, Some(market_cap))
    }
}

impl SeriesFetcher for SyntheticFetcher {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch(&self, symbol: &str) -> Result<SymbolSeries, FetchFailure> {
        if symbol.is_empty() {
            return Err(FetchFailure::not_found(symbol));
        }
        Ok(self.generate(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> SyntheticFetcher {
        SyntheticFetcher::new(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
    }

    #[test]
    fn one_year_of_weekdays() {
        let series = fetcher().fetch("SPY").unwrap();
        assert!(series.len() >= 250 && series.len() <= 262, "got {}", series.len());
        assert!(series.bars().iter().all(|b| b.is_sane()));
        assert_eq!(
            series.last().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }

    #[test]
    fn deterministic_per_symbol() {
        let a = fetcher().fetch("AAPL").unwrap();
        let b = fetcher().fetch("AAPL").unwrap();
        let c = fetcher().fetch("MSFT").unwrap();
        assert_eq!(a, b);
        assert_ne!(a.bars(), c.bars());
    }

    #[test]
    fn reports_a_market_cap() {
        let series = fetcher().fetch("NVDA").unwrap();
        assert!(series.market_cap().unwrap() > 0.0);
    }
}
