//! Analytics Computations
//!
//! Pure, synchronous stages: no I/O, no logging, no shared state. Each
//! function takes borrowed input and returns an owned result or an
//! [`AnalyticsError`](crate::error::AnalyticsError).

pub mod indicators;
pub mod portfolio;
pub mod returns;
pub mod risk;

pub use indicators::{IndicatorEngine, rolling_sma, rsi, sma};
pub use portfolio::{
    AlignedPrices, PortfolioAggregation, correlation, normalize_weights, value_series,
};
pub use returns::{log_returns, simple_returns};
pub use risk::{RiskMetricsEngine, historical_var};
