//! Screener Core — price bars, symbol input, data providers, indicator engine.
//!
//! This crate contains the per-symbol half of the pipeline:
//! - Domain types (price bars, symbol series, indicator rows)
//! - Symbol normalization of free-text ticker lists
//! - The `SeriesFetcher` provider boundary (Yahoo Finance, synthetic, in-memory)
//! - Rolling indicators (SMA, sample stddev, Bollinger bands, range extremes)
//! - The stateless indicator engine turning one series into one row

pub mod data;
pub mod domain;
pub mod indicators;
pub mod metrics;

pub use metrics::{compute, compute_with, EngineParams, IndicatorError, Shortfall};
