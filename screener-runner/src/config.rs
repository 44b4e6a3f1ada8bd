//! Screener configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Command-line flags are applied on top by the binary.

use std::path::Path;
use std::time::Duration;

use screener_core::data::{CircuitBreaker, YahooOptions};
use screener_core::EngineParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembler::AssembleOptions;

pub const DEFAULT_SYMBOLS: &str = "AAPL, MSFT, TSLA, NVDA";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Provider tuning for the live Yahoo fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// How long the circuit breaker stays open after tripping.
    pub cooldown_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            cooldown_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    /// Raw comma-separated symbol list, normalized at run time.
    pub symbols: String,
    pub dedup_symbols: bool,
    pub max_concurrency: usize,
    pub engine: EngineParams,
    pub provider: ProviderConfig,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.to_string(),
            dedup_symbols: true,
            max_concurrency: 1,
            engine: EngineParams::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl ScreenerConfig {
    /// Load from a TOML file. A missing file means defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.engine.bb_period < 2 {
            return Err(ConfigError::Invalid(format!(
                "engine.bb_period must be at least 2, got {}",
                self.engine.bb_period
            )));
        }
        if !(self.engine.bb_multiplier.is_finite() && self.engine.bb_multiplier > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "engine.bb_multiplier must be positive, got {}",
                self.engine.bb_multiplier
            )));
        }
        Ok(())
    }

    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            max_concurrency: self.max_concurrency,
            dedup_symbols: self.dedup_symbols,
            engine: self.engine,
        }
    }

    pub fn yahoo_options(&self) -> YahooOptions {
        YahooOptions {
            timeout: Duration::from_secs(self.provider.timeout_secs),
            max_retries: self.provider.max_retries,
            ..YahooOptions::default()
        }
    }

    pub fn circuit_breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(Duration::from_secs(self.provider.cooldown_secs), 3)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
