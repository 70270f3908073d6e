//! Service Kit
//!
//! The request/response operations consumers call. Every service reads
//! prices through one shared [`PriceSeriesProvider`], so they all see the
//! same cache.

mod dca_signal;
mod portfolio_risk;
mod price_lookup;

pub use dca_signal::{DcaSignalReport, DcaSignalService, IndicatorPoint};
pub use portfolio_risk::{AssetCorrelation, AssetRisk, PortfolioRiskReport, PortfolioRiskService};
pub use price_lookup::{HistoricalPriceRow, PriceLookupService};

use std::sync::Arc;

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::metrics::IndicatorEngine;
use crate::model::{AssetInfo, PriceSeries};
use crate::provider::{FetchPolicy, PriceSeriesProvider};
use crate::source;
use crate::strategy::SignalClassifier;

/// Facade over the price, risk and signal services
pub struct AnalyticsService {
    provider: Arc<PriceSeriesProvider>,
    prices: PriceLookupService,
    risk: PortfolioRiskService,
    signals: DcaSignalService,
}

impl AnalyticsService {
    pub fn new(provider: Arc<PriceSeriesProvider>, config: &AnalyticsConfig) -> Self {
        Self {
            prices: PriceLookupService::new(Arc::clone(&provider)),
            risk: PortfolioRiskService::new(Arc::clone(&provider), config.var_confidence),
            signals: DcaSignalService::new(
                Arc::clone(&provider),
                IndicatorEngine::new(config.windows),
                SignalClassifier::new(config.thresholds),
            ),
            provider,
        }
    }

    /// Build the configured price source and provider
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        let source = source::from_config(config)?;
        let provider = PriceSeriesProvider::new(source, FetchPolicy::from(config));
        Ok(Self::new(Arc::new(provider), config))
    }

    pub fn provider(&self) -> &Arc<PriceSeriesProvider> {
        &self.provider
    }

    pub fn list_assets(&self) -> Vec<AssetInfo> {
        self.prices.list_assets()
    }

    pub async fn get_asset_prices(&self, asset: &str) -> Result<Arc<PriceSeries>> {
        self.prices.get_asset_prices(asset).await
    }

    pub async fn historical_prices(&self) -> Result<Vec<HistoricalPriceRow>> {
        self.prices.historical_prices().await
    }

    /// `confidence` falls back to the configured VaR confidence
    pub async fn calculate_portfolio_risk(
        &self,
        weights: &[f64],
        confidence: Option<f64>,
    ) -> Result<PortfolioRiskReport> {
        self.risk.calculate(weights, confidence).await
    }

    pub async fn get_dca_signal(&self, asset: &str) -> Result<DcaSignalReport> {
        self.signals.signal(asset).await
    }

    pub async fn get_indicator_history(&self, asset: &str) -> Result<Vec<IndicatorPoint>> {
        self.signals.indicator_history(asset).await
    }
}
