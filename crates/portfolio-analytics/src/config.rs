//! Configuration
//!
//! Runtime settings come from the environment (`ANALYTICS_*`); indicator
//! windows and classifier thresholds are plain serde structs with defaults.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Which upstream supplies price history
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Csv,
    Yahoo,
    Memory,
}

impl FromStr for SourceKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "yahoo" => Ok(Self::Yahoo),
            "memory" => Ok(Self::Memory),
            other => Err(AnalyticsError::Config(format!(
                "unknown price source '{other}' (expected csv, yahoo or memory)"
            ))),
        }
    }
}

/// Look-back windows for the technical indicators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorWindows {
    pub sma_short: usize,
    pub sma_long: usize,
    pub rsi: usize,
}

impl Default for IndicatorWindows {
    fn default() -> Self {
        Self {
            sma_short: 20,
            sma_long: 50,
            rsi: 14,
        }
    }
}

/// Classifier thresholds.
///
/// These are calibration defaults, not derived values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    /// RSI above this with an established uptrend is a SELL
    pub overbought: f64,
    /// RSI below this with an established downtrend is a BUY
    pub oversold: f64,
    /// RSI below this with price under the short SMA is a mild-dip BUY
    pub mild_dip: f64,
    /// Price-to-SMA deviation that maps to full deviation confidence
    pub deviation_scale: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            overbought: 70.0,
            oversold: 30.0,
            mild_dip: 40.0,
            deviation_scale: 0.10,
        }
    }
}

/// Yahoo Finance chart API settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YahooConfig {
    pub base_url: String,
    /// Chart range, e.g. "1y", "5y", "max"
    pub range: String,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".into(),
            range: "5y".into(),
        }
    }
}

/// Top-level analytics configuration
#[derive(Clone, Debug)]
pub struct AnalyticsConfig {
    pub source: SourceKind,

    /// Directory holding `historical_prices_*.csv` files
    pub data_dir: PathBuf,

    pub yahoo: YahooConfig,

    /// How long a fetched series stays fresh
    pub cache_ttl: Duration,

    /// Per-attempt upstream timeout
    pub fetch_timeout: Duration,

    /// Extra attempts after the first failure
    pub max_retries: u32,

    pub retry_backoff: Duration,

    /// Default VaR confidence when a request does not name one
    pub var_confidence: f64,

    pub windows: IndicatorWindows,

    pub thresholds: SignalThresholds,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Csv,
            data_dir: PathBuf::from("./data/raw"),
            yahoo: YahooConfig::default(),
            cache_ttl: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            var_confidence: 0.95,
            windows: IndicatorWindows::default(),
            thresholds: SignalThresholds::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let source = lookup("ANALYTICS_PRICE_SOURCE")
            .map(|s| s.parse::<SourceKind>())
            .transpose()?
            .unwrap_or(defaults.source);

        let data_dir = lookup("ANALYTICS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let yahoo = YahooConfig {
            base_url: lookup("ANALYTICS_YAHOO_BASE_URL").unwrap_or(defaults.yahoo.base_url),
            range: lookup("ANALYTICS_YAHOO_RANGE").unwrap_or(defaults.yahoo.range),
        };

        let cache_ttl = parse_key::<u64, _>(&lookup, "ANALYTICS_CACHE_TTL_SECS")?
            .map_or(defaults.cache_ttl, Duration::from_secs);
        let fetch_timeout = parse_key::<u64, _>(&lookup, "ANALYTICS_FETCH_TIMEOUT_SECS")?
            .map_or(defaults.fetch_timeout, Duration::from_secs);
        let max_retries =
            parse_key(&lookup, "ANALYTICS_FETCH_RETRIES")?.unwrap_or(defaults.max_retries);
        let retry_backoff = parse_key::<u64, _>(&lookup, "ANALYTICS_RETRY_BACKOFF_MS")?
            .map_or(defaults.retry_backoff, Duration::from_millis);

        let var_confidence =
            parse_key(&lookup, "ANALYTICS_VAR_CONFIDENCE")?.unwrap_or(defaults.var_confidence);
        if !(var_confidence > 0.0 && var_confidence < 1.0) {
            return Err(AnalyticsError::Config(format!(
                "ANALYTICS_VAR_CONFIDENCE must be in (0, 1), got {var_confidence}"
            )));
        }

        Ok(Self {
            source,
            data_dir,
            yahoo,
            cache_ttl,
            fetch_timeout,
            max_retries,
            retry_backoff,
            var_confidence,
            windows: defaults.windows,
            thresholds: defaults.thresholds,
        })
    }
}

fn parse_key<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| AnalyticsError::Config(format!("{key}={raw}: {e}")))
        })
        .transpose()
}
