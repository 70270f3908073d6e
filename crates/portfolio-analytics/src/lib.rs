//! # portfolio-analytics
//!
//! Portfolio risk and dollar-cost-averaging timing for a small fixed set of
//! assets (VN30, gold, bitcoin).
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐    ┌─────────────────────┐
//! │ PriceSource  │───▶│ PriceSeriesProvider │  TTL cache, coalesced fetches,
//! │ csv / yahoo  │    │                     │  timeout + bounded retries
//! └──────────────┘    └──────────┬──────────┘
//!                                │ Arc<PriceSeries>
//!             ┌──────────────────┴──────────────────┐
//!             ▼                                     ▼
//!   ┌───────────────────┐                 ┌───────────────────┐
//!   │ IndicatorEngine   │                 │ simple returns    │
//!   │ SMA20/SMA50/RSI14 │                 │ per asset         │
//!   └─────────┬─────────┘                 └─────────┬─────────┘
//!             ▼                                     ▼
//!   ┌───────────────────┐                 ┌───────────────────┐
//!   │ SignalClassifier  │                 │ Portfolio         │
//!   │ BUY / HOLD / SELL │                 │ Aggregation       │
//!   └───────────────────┘                 └─────────┬─────────┘
//!                                                   ▼
//!                                         ┌───────────────────┐
//!                                         │ RiskMetricsEngine │
//!                                         │ VaR, ES, vol      │
//!                                         └───────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use portfolio_analytics::{AnalyticsConfig, AnalyticsService};
//!
//! # async fn run() -> portfolio_analytics::Result<()> {
//! let service = AnalyticsService::from_config(&AnalyticsConfig::from_env()?)?;
//! let risk = service.calculate_portfolio_risk(&[0.5, 0.3, 0.2], None).await?;
//! let signal = service.get_dca_signal("btcusd").await?;
//! println!("VaR {:.4}, {} ({:.2})", risk.var, signal.signal, signal.confidence);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod provider;
pub mod source;
pub mod strategy;
pub mod svckit;

pub use config::{AnalyticsConfig, IndicatorWindows, SignalThresholds, SourceKind};
pub use error::{AnalyticsError, Result};
pub use model::{
    AssetId, AssetInfo, IndicatorSnapshot, PortfolioValuePoint, PricePoint, PriceSeries,
    ReturnSeries, RiskMetrics, Signal, SignalKind,
};
pub use provider::{FetchPolicy, PriceSeriesProvider};
pub use source::PriceSource;
pub use strategy::SignalClassifier;
pub use svckit::{
    AnalyticsService, AssetCorrelation, AssetRisk, DcaSignalReport, HistoricalPriceRow,
    IndicatorPoint, PortfolioRiskReport,
};
