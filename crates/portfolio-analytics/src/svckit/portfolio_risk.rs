//! Portfolio Risk Service
//!
//! Weighted portfolio over all configured assets: risk metrics, the
//! compounded value curve, per-asset log-return VaR and pairwise return
//! correlations.

use std::sync::Arc;

use serde::Serialize;

use super::price_lookup::fetch_all;
use crate::error::Result;
use crate::metrics::risk::sample_std;
use crate::metrics::{
    PortfolioAggregation, RiskMetricsEngine, correlation, log_returns, normalize_weights,
};
use crate::model::{AssetId, PortfolioValuePoint, PriceSeries};
use crate::provider::PriceSeriesProvider;

/// Result of a portfolio risk calculation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PortfolioRiskReport {
    pub var: f64,
    pub mean_return: f64,
    pub volatility: f64,
    /// `prod(1 + r) - 1` over every portfolio return
    pub cumulative_return: f64,
    pub expected_shortfall: f64,
    /// Normalized, in asset order
    pub weights: Vec<f64>,
    /// Starts at 100 on the first return date. The first return only sets
    /// the base date, so `last / 100 - 1` is not `cumulative_return`.
    pub portfolio_values: Vec<PortfolioValuePoint>,
    pub assets: Vec<AssetRisk>,
    pub correlations: Vec<AssetCorrelation>,
}

/// Stand-alone risk of one holding over the aligned dates
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AssetRisk {
    pub asset: AssetId,
    pub weight: f64,
    /// Historical VaR of daily log returns
    pub log_var: f64,
    /// Sample volatility of daily simple returns
    pub volatility: f64,
}

/// Pearson correlation of two assets' daily simple returns
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AssetCorrelation {
    pub first: AssetId,
    pub second: AssetId,
    /// `None` when either asset has no return variance
    pub correlation: Option<f64>,
}

pub struct PortfolioRiskService {
    provider: Arc<PriceSeriesProvider>,
    default_confidence: f64,
}

impl PortfolioRiskService {
    pub fn new(provider: Arc<PriceSeriesProvider>, default_confidence: f64) -> Self {
        Self {
            provider,
            default_confidence,
        }
    }

    /// Risk of a portfolio holding `weights` of each asset (VN30, XAU, BTC).
    ///
    /// Weights and confidence are validated before any price is fetched.
    pub async fn calculate(
        &self,
        weights: &[f64],
        confidence: Option<f64>,
    ) -> Result<PortfolioRiskReport> {
        let weights = normalize_weights(weights, AssetId::ALL.len())?;
        let engine = RiskMetricsEngine::new(confidence.unwrap_or(self.default_confidence))?;

        let series = fetch_all(&self.provider).await?;
        let refs: Vec<&PriceSeries> = series.iter().map(AsRef::as_ref).collect();

        let aggregation = PortfolioAggregation::from_normalized(&refs, weights)?;
        let metrics = engine.compute(&aggregation.returns.values)?;
        let assets = asset_risks(&aggregation, engine)?;
        let correlations = correlations(&aggregation);

        Ok(PortfolioRiskReport {
            var: metrics.var,
            mean_return: metrics.mean_return,
            volatility: metrics.volatility,
            cumulative_return: metrics.cumulative_return,
            expected_shortfall: metrics.expected_shortfall,
            weights: aggregation.weights,
            portfolio_values: aggregation.values,
            assets,
            correlations,
        })
    }
}

fn asset_risks(
    aggregation: &PortfolioAggregation,
    engine: RiskMetricsEngine,
) -> Result<Vec<AssetRisk>> {
    AssetId::ALL
        .into_iter()
        .map(|asset| {
            let i = asset.index();
            let logs = log_returns(&aggregation.aligned.column_series(i)?)?;
            Ok(AssetRisk {
                asset,
                weight: aggregation.weights[i],
                log_var: engine.compute(&logs.values)?.var,
                volatility: sample_std(&aggregation.asset_returns[i].values),
            })
        })
        .collect()
}

fn correlations(aggregation: &PortfolioAggregation) -> Vec<AssetCorrelation> {
    let mut pairs = Vec::new();
    for (i, first) in AssetId::ALL.into_iter().enumerate() {
        for second in AssetId::ALL.into_iter().skip(i + 1) {
            pairs.push(AssetCorrelation {
                first,
                second,
                correlation: correlation(
                    &aggregation.asset_returns[first.index()].values,
                    &aggregation.asset_returns[second.index()].values,
                ),
            });
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use crate::provider::FetchPolicy;
    use crate::source::InMemoryPriceSource;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn service(source: InMemoryPriceSource) -> PortfolioRiskService {
        let provider = PriceSeriesProvider::new(Arc::new(source), FetchPolicy::default());
        PortfolioRiskService::new(Arc::new(provider), 0.95)
    }

    #[tokio::test]
    async fn test_single_asset_weighting_matches_asset_returns() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let source = InMemoryPriceSource::new()
            .with_daily_prices(AssetId::Vn30, start, &[100.0, 110.0, 121.0])
            .with_daily_prices(AssetId::Xautusd, start, &[50.0, 40.0, 60.0])
            .with_daily_prices(AssetId::Btcusd, start, &[10.0, 30.0, 5.0]);

        let report = service(source).calculate(&[1.0, 0.0, 0.0], None).await.unwrap();
        assert_eq!(report.weights, vec![1.0, 0.0, 0.0]);
        assert_relative_eq!(report.mean_return, 0.10, epsilon = 1e-12);
        assert_relative_eq!(report.volatility, 0.0, epsilon = 1e-12);
        assert_relative_eq!(report.cumulative_return, 0.21, epsilon = 1e-12);
        assert_relative_eq!(report.var, 0.0);
        assert_eq!(report.portfolio_values.len(), 2);

        // vn30 rises 10% twice: no log-return loss, no volatility
        assert_eq!(report.assets[0].asset, AssetId::Vn30);
        assert_relative_eq!(report.assets[0].log_var, 0.0);
        assert_relative_eq!(report.assets[0].volatility, 0.0, epsilon = 1e-12);
        // gold: ln(40/50) is the worse day
        assert!(report.assets[1].log_var > 0.0);

        assert_eq!(report.correlations.len(), 3);
        assert_eq!(
            (report.correlations[0].first, report.correlations[0].second),
            (AssetId::Vn30, AssetId::Xautusd)
        );
        // flat vn30 returns have no variance
        assert!(report.correlations[0].correlation.is_none());
        // gold -20%/+50% against btc +200%/-83%: opposite moves
        let gold_btc = report.correlations[2].correlation.unwrap();
        assert_relative_eq!(gold_btc, -1.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_sample_portfolio_report() {
        let report = service(InMemoryPriceSource::sample())
            .calculate(&[0.5, 0.3, 0.2], Some(0.99))
            .await
            .unwrap();

        assert_relative_eq!(report.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert_eq!(report.portfolio_values.len(), 179);
        assert_relative_eq!(report.portfolio_values[0].value, 100.0);
        assert!(report.volatility > 0.0);
        assert!(report.expected_shortfall >= report.var);
    }

    #[tokio::test]
    async fn test_rejects_bad_input_before_fetching() {
        // an empty source would fail the fetch, so these errors come first
        let svc = service(InMemoryPriceSource::new());

        assert!(matches!(
            svc.calculate(&[0.5, 0.5], None).await,
            Err(AnalyticsError::InvalidWeights(_))
        ));
        assert!(matches!(
            svc.calculate(&[0.0, 0.0, 0.0], None).await,
            Err(AnalyticsError::InvalidWeights(_))
        ));
        assert!(matches!(
            svc.calculate(&[0.5, 0.3, 0.2], Some(1.0)).await,
            Err(AnalyticsError::InvalidConfidenceLevel(_))
        ));
    }
}
