//! Yahoo Finance series fetcher.
//!
//! Fetches one trailing year of daily bars from Yahoo's v8 chart API and the
//! market capitalization from the v7 quote API. Handles rate limiting, retries
//! with exponential backoff, response parsing, and the circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The quote endpoint in particular is often gated; a failed market-cap lookup
//! never fails the fetch, it only leaves the market cap unknown. It is a single
//! attempt outside the retry loop and never counts against the circuit breaker.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataSource, FetchFailure, SeriesFetcher};
use crate::domain::{PriceBar, SymbolSeries};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const CHART_BASE: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
pub const QUOTE_BASE: &str = "https://query1.finance.yahoo.com/v7/finance/quote";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
}

/// Yahoo Finance v7 quote API response (only the fields we read).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    quote_response: QuoteResult,
}

#[derive(Debug, Deserialize)]
struct QuoteResult {
    result: Option<Vec<QuoteSummary>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummary {
    market_cap: Option<f64>,
}

/// Endpoints, retry and timeout settings for [`YahooFetcher`].
#[derive(Debug, Clone)]
pub struct YahooOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Chart API base; the symbol is appended as a path segment.
    pub chart_base: String,
    pub quote_base: String,
}

impl Default for YahooOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            chart_base: CHART_BASE.to_string(),
            quote_base: QUOTE_BASE.to_string(),
        }
    }
}

pub struct YahooFetcher {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    options: YahooOptions,
}

impl YahooFetcher {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        options: YahooOptions,
    ) -> Result<Self, FetchFailure> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| FetchFailure::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            options,
        })
    }

    /// Chart URL with the symbol percent-encoded as a single path segment.
    fn chart_url(&self, symbol: &str) -> Result<reqwest::Url, FetchFailure> {
        let bad_base =
            |detail: String| FetchFailure::Other(format!("bad chart base URL: {detail}"));
        let mut url = reqwest::Url::parse(&self.options.chart_base)
            .map_err(|e| bad_base(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| bad_base(self.options.chart_base.clone()))?
            .pop_if_empty()
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("range", "1y")
            .append_pair("interval", "1d")
            .append_pair("includePrePost", "false");
        Ok(url)
    }

    /// Parse a chart API body into bars.
    ///
    /// Days where any OHLC value is missing (holidays, halted sessions) are skipped.
    /// An answer with no usable bars counts as "not found".
    fn parse_chart(symbol: &str, body: &str) -> Result<Vec<PriceBar>, FetchFailure> {
        let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
            FetchFailure::ResponseFormatChanged(format!("failed to parse chart for {symbol}: {e}"))
        })?;

        let result = match (resp.chart.result, resp.chart.error) {
            (Some(result), _) => result,
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(FetchFailure::not_found(symbol));
            }
            (None, Some(err)) => {
                return Err(FetchFailure::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                )));
            }
            (None, None) => {
                return Err(FetchFailure::ResponseFormatChanged(
                    "empty result with no error".into(),
                ));
            }
        };

        let Some(data) = result.into_iter().next() else {
            return Err(FetchFailure::not_found(symbol));
        };

        // A valid symbol with no trading history comes back without timestamps.
        let timestamps = data.timestamp.unwrap_or_default();

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| FetchFailure::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    FetchFailure::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let field = |v: &[Option<f64>]| v.get(i).copied().flatten();
            let (Some(open), Some(high), Some(low), Some(close)) = (
                field(&quote.open),
                field(&quote.high),
                field(&quote.low),
                field(&quote.close),
            ) else {
                continue;
            };

            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
            });
        }

        if bars.is_empty() {
            return Err(FetchFailure::not_found(symbol));
        }

        Ok(bars)
    }

    /// Parse a quote API body into a market cap, if one is reported.
    fn parse_market_cap(body: &str) -> Option<f64> {
        let resp: QuoteResponse = serde_json::from_str(body).ok()?;
        resp.quote_response
            .result?
            .into_iter()
            .next()?
            .market_cap
            .filter(|cap| cap.is_finite() && *cap > 0.0)
    }

    /// GET a URL with retry and circuit breaker logic, returning the response body.
    fn get_with_retry(&self, symbol: &str, url: &reqwest::Url) -> Result<String, FetchFailure> {
        if !self.circuit_breaker.is_allowed() {
            return Err(FetchFailure::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let delay = self.options.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(symbol, attempt, ?delay, "retrying provider request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(FetchFailure::CircuitBreakerTripped);
            }

            let resp = match self.client.get(url.clone()).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(FetchFailure::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(FetchFailure::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(FetchFailure::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                tracing::warn!(symbol, retry_after, "rate limited by provider");
                last_error = Some(FetchFailure::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            // The chart API answers unknown symbols with 404 and a JSON error body.
            if status == reqwest::StatusCode::NOT_FOUND {
                return resp
                    .text()
                    .map_err(|e| FetchFailure::NetworkUnreachable(e.to_string()));
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(FetchFailure::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let body = resp
                .text()
                .map_err(|e| FetchFailure::NetworkUnreachable(e.to_string()))?;
            self.circuit_breaker.record_success();
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| FetchFailure::Other("max retries exceeded".into())))
    }

    /// One attempt, no retries, no breaker bookkeeping. Any failure is `None`.
    fn fetch_market_cap(&self, symbol: &str) -> Option<f64> {
        let resp = match self
            .client
            .get(&self.options.quote_base)
            .query(&[("symbols", symbol)])
            .send()
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(symbol, error = %e, "market cap unavailable");
                return None;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(symbol, %status, "market cap unavailable");
            return None;
        }
        resp.text().ok().and_then(|body| Self::parse_market_cap(&body))
    }
}

impl SeriesFetcher for YahooFetcher {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn source(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn fetch(&self, symbol: &str) -> Result<SymbolSeries, FetchFailure> {
        let body = self.get_with_retry(symbol, &self.chart_url(symbol)?)?;
        let bars = Self::parse_chart(symbol, &body)?;
        let market_cap = self.fetch_market_cap(symbol);
        tracing::debug!(symbol, bars = bars.len(), ?market_cap, "fetched series");
        Ok(SymbolSeries::new(symbol, bars, market_cap))
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }

    fn retry_after(&self) -> Option<Duration> {
        Some(self.circuit_breaker.remaining_cooldown()).filter(|d| !d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_OK: &str = r#"{"chart":{"result":[{"meta":{"symbol":"SPY"},
        "timestamp":[1704205800,1704292200,1704378600],
        "indicators":{"quote":[{
            "open":[472.16,470.43,null],
            "high":[473.67,471.19,null],
            "low":[470.49,468.17,null],
            "close":[472.65,468.79,null],
            "volume":[123,456,null]}]}}],"error":null}}"#;

    const CHART_NOT_FOUND: &str = r#"{"chart":{"result":null,
        "error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;

    #[test]
    fn parses_bars_and_skips_missing_days() {
        let bars = YahooFetcher::parse_chart("SPY", CHART_OK).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 472.65);
        assert_eq!(bars[1].low, 468.17);
        assert!(bars[0].date < bars[1].date);
    }

    #[test]
    fn not_found_error_maps_to_not_found() {
        let err = YahooFetcher::parse_chart("ZZZZ", CHART_NOT_FOUND).unwrap_err();
        assert_eq!(err, FetchFailure::not_found("ZZZZ"));
    }

    #[test]
    fn other_api_errors_are_format_changes() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"x"}}}"#;
        let err = YahooFetcher::parse_chart("SPY", body).unwrap_err();
        assert!(matches!(err, FetchFailure::ResponseFormatChanged(_)));
    }

    #[test]
    fn empty_history_is_not_found() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{
            "open":[],"high":[],"low":[],"close":[]}]}}],"error":null}}"#;
        let err = YahooFetcher::parse_chart("NEWIPO", body).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn garbage_body_is_format_change() {
        let err = YahooFetcher::parse_chart("SPY", "<html>").unwrap_err();
        assert!(matches!(err, FetchFailure::ResponseFormatChanged(_)));
    }

    #[test]
    fn parses_market_cap() {
        let body = r#"{"quoteResponse":{"result":[{"symbol":"AAPL","marketCap":3.5e12}],"error":null}}"#;
        assert_eq!(YahooFetcher::parse_market_cap(body), Some(3.5e12));
    }

    #[test]
    fn missing_market_cap_is_unknown() {
        let etf = r#"{"quoteResponse":{"result":[{"symbol":"SPY"}],"error":null}}"#;
        assert_eq!(YahooFetcher::parse_market_cap(etf), None);
        assert_eq!(YahooFetcher::parse_market_cap(r#"{"finance":{"error":{}}}"#), None);
    }

    fn fetcher(options: YahooOptions) -> YahooFetcher {
        YahooFetcher::new(Arc::new(CircuitBreaker::new(Duration::from_secs(60), 3)), options)
            .unwrap()
    }

    #[test]
    fn chart_url_requests_one_year_daily() {
        let url = fetcher(YahooOptions::default()).chart_url("MSFT").unwrap();
        assert!(url.as_str().starts_with(CHART_BASE));
        assert!(url.path().ends_with("/chart/MSFT"));
        assert!(url.as_str().contains("range=1y"));
        assert!(url.as_str().contains("interval=1d"));
    }

    #[test]
    fn chart_url_escapes_the_symbol() {
        let url = fetcher(YahooOptions::default()).chart_url("BRK?B&x#y/z").unwrap();
        assert!(url.path().ends_with("/chart/BRK%3FB&x%23y%2Fz"));
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query_pairs().count(), 3);
    }

    // ── Live fetch against a local HTTP stub ─────────────────────────

    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves chart requests with `CHART_OK` and quote requests with `quote`.
    /// Returns the base address and a counter of quote requests seen.
    fn serve(quote: (u16, &'static str)) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let quote_hits = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&quote_hits);

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut header = String::new();
                while reader.read_line(&mut header).unwrap() > 2 {
                    header.clear();
                }

                let (status, body) = if request_line.contains("/quote") {
                    hits.fetch_add(1, Ordering::SeqCst);
                    quote
                } else {
                    (200, CHART_OK)
                };
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        (format!("http://{addr}"), quote_hits)
    }

    fn local_options(base: &str) -> YahooOptions {
        YahooOptions {
            timeout: Duration::from_secs(5),
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            chart_base: format!("{base}/v8/finance/chart"),
            quote_base: format!("{base}/v7/finance/quote"),
        }
    }

    #[test]
    fn gated_quote_endpoint_leaves_breaker_closed() {
        let (base, quote_hits) = serve((401, r#"{"finance":{"error":{"code":"Unauthorized"}}}"#));
        let yahoo = fetcher(local_options(&base));

        for symbol in ["AAPL", "MSFT", "TSLA", "NVDA"] {
            let series = yahoo.fetch(symbol).unwrap();
            assert_eq!(series.len(), 2);
            assert_eq!(series.market_cap(), None);
        }

        assert!(yahoo.is_available());
        assert_eq!(yahoo.retry_after(), None);
        // One attempt per symbol, no retries.
        assert_eq!(quote_hits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn quote_endpoint_supplies_market_cap() {
        let (base, _) = serve((
            200,
            r#"{"quoteResponse":{"result":[{"symbol":"SPY","marketCap":5.1e11}],"error":null}}"#,
        ));
        let series = fetcher(local_options(&base)).fetch("SPY").unwrap();
        assert_eq!(series.market_cap(), Some(5.1e11));
    }
}
