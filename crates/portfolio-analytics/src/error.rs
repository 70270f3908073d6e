//! Error Types for Portfolio Analytics

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::AssetId;

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Series too short for the requested window or statistic
    #[error("Insufficient data: need at least {needed} observations, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// Non-positive or non-finite price where a return or average needs it
    #[error("Invalid price {price} on {date}")]
    InvalidPrice { date: NaiveDate, price: f64 },

    /// Dates not strictly ascending
    #[error("Invalid price series: {0}")]
    InvalidSeries(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Insufficient overlap: only {common} common dates across assets (need 2)")]
    InsufficientOverlap { common: usize },

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Confidence level must be strictly between 0 and 1, got {0}")]
    InvalidConfidenceLevel(f64),

    /// Upstream price fetch failed after all retries
    #[error("Price data for {asset} unavailable after {attempts} attempt(s): {reason}")]
    DataSourceUnavailable {
        asset: AssetId,
        attempts: u32,
        reason: String,
    },

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Fetch timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    /// Whether a failed upstream attempt is worth repeating
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::Timeout | Self::Network(_) | Self::Io(_)
        )
    }

    /// Stable identifier for mapping to a client-facing status
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::InvalidPrice { .. } | Self::InvalidSeries(_) => "INVALID_PRICE",
            Self::InvalidWeights(_) => "INVALID_WEIGHTS",
            Self::InsufficientOverlap { .. } => "INSUFFICIENT_OVERLAP",
            Self::UnknownAsset(_) => "UNKNOWN_ASSET",
            Self::InvalidConfidenceLevel(_) => "INVALID_CONFIDENCE_LEVEL",
            Self::DataSourceUnavailable { .. }
            | Self::Fetch(_)
            | Self::Timeout
            | Self::Network(_)
            | Self::Csv(_)
            | Self::Io(_) => "DATA_SOURCE_UNAVAILABLE",
            Self::Config(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Whether the caller supplied bad input (as opposed to a data or upstream fault)
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidWeights(_) | Self::UnknownAsset(_) | Self::InvalidConfidenceLevel(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientData { needed, .. } => {
                format!("Not enough price history for this analysis (need {needed} points).")
            }
            Self::InvalidPrice { date, .. } => {
                format!("The price history contains an invalid price on {date}.")
            }
            Self::InvalidSeries(_) => "The price history is malformed.".into(),
            Self::InvalidWeights(msg) => format!("Invalid portfolio weights: {msg}"),
            Self::InsufficientOverlap { .. } => {
                "The selected assets do not share enough trading dates.".into()
            }
            Self::UnknownAsset(id) => format!("Asset '{id}' is not available."),
            Self::InvalidConfidenceLevel(_) => {
                "Confidence level must be between 0 and 1.".into()
            }
            Self::Config(_) => "Service configuration error.".into(),
            _ => "Price data is currently unavailable. Please try again.".into(),
        }
    }
}
