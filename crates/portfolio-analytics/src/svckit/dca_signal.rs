//! DCA Signal Service
//!
//! Indicator snapshot and BUY/HOLD/SELL timing signal for one asset, plus
//! the rolling averages behind it for charting.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::metrics::{IndicatorEngine, rolling_sma};
use crate::model::{AssetId, Signal, SignalKind};
use crate::provider::PriceSeriesProvider;
use crate::strategy::SignalClassifier;

/// Flattened signal for consumers
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DcaSignalReport {
    pub signal: SignalKind,
    pub confidence: f64,
    pub reasoning: String,
    pub current_price: f64,
    pub sma_20: f64,
    pub sma_50: f64,
    pub rsi: f64,
}

impl From<Signal> for DcaSignalReport {
    fn from(signal: Signal) -> Self {
        Self {
            signal: signal.kind,
            confidence: signal.confidence,
            reasoning: signal.reasoning,
            current_price: signal.snapshot.current_price,
            sma_20: signal.snapshot.sma_20,
            sma_50: signal.snapshot.sma_50,
            rsi: signal.snapshot.rsi,
        }
    }
}

/// Price and moving averages on one day; averages are `None` during warm-up
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub price: f64,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
}

pub struct DcaSignalService {
    provider: Arc<PriceSeriesProvider>,
    indicators: IndicatorEngine,
    classifier: SignalClassifier,
}

impl DcaSignalService {
    pub fn new(
        provider: Arc<PriceSeriesProvider>,
        indicators: IndicatorEngine,
        classifier: SignalClassifier,
    ) -> Self {
        Self {
            provider,
            indicators,
            classifier,
        }
    }

    pub async fn signal(&self, asset: &str) -> Result<DcaSignalReport> {
        let asset: AssetId = asset.parse()?;
        let series = self.provider.get(asset).await?;
        let snapshot = self.indicators.snapshot(&series)?;
        Ok(self.classifier.classify(&snapshot).into())
    }

    /// Short and long SMA at every date of the asset's history
    pub async fn indicator_history(&self, asset: &str) -> Result<Vec<IndicatorPoint>> {
        let asset: AssetId = asset.parse()?;
        let series = self.provider.get(asset).await?;
        let windows = self.indicators.windows();

        let prices: Vec<f64> = series.prices().collect();
        let short = rolling_sma(&prices, windows.sma_short);
        let long = rolling_sma(&prices, windows.sma_long);

        Ok(series
            .points()
            .iter()
            .zip(short.into_iter().zip(long))
            .map(|(point, (sma_20, sma_50))| IndicatorPoint {
                date: point.date,
                price: point.price,
                sma_20,
                sma_50,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use crate::provider::FetchPolicy;
    use crate::source::InMemoryPriceSource;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn service(source: InMemoryPriceSource) -> DcaSignalService {
        let provider = PriceSeriesProvider::new(Arc::new(source), FetchPolicy::default());
        DcaSignalService::new(
            Arc::new(provider),
            IndicatorEngine::default(),
            SignalClassifier::default(),
        )
    }

    #[tokio::test]
    async fn test_steady_rally_is_sell() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + f64::from(i)).collect();
        let source = InMemoryPriceSource::new().with_daily_prices(AssetId::Btcusd, start, &prices);

        let report = service(source).signal("btcusd").await.unwrap();
        assert_eq!(report.signal, SignalKind::Sell);
        assert_relative_eq!(report.current_price, 159.0);
        assert_relative_eq!(report.rsi, 100.0);
        assert!((0.0..=1.0).contains(&report.confidence));
    }

    #[tokio::test]
    async fn test_steady_decline_is_buy() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let prices: Vec<f64> = (0..60).map(|i| 200.0 - f64::from(i)).collect();
        let source = InMemoryPriceSource::new().with_daily_prices(AssetId::Vn30, start, &prices);

        let report = service(source).signal("vn30").await.unwrap();
        assert_eq!(report.signal, SignalKind::Buy);
        assert!(report.reasoning.contains("oversold"));
    }

    #[tokio::test]
    async fn test_short_history_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let source =
            InMemoryPriceSource::new().with_daily_prices(AssetId::Xautusd, start, &[2000.0; 30]);

        let err = service(source).signal("xautusd").await.unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::InsufficientData { needed: 50, available: 30 }
        ));
    }

    #[tokio::test]
    async fn test_indicator_history_warms_up() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let prices: Vec<f64> = (1..=60).map(f64::from).collect();
        let source = InMemoryPriceSource::new().with_daily_prices(AssetId::Btcusd, start, &prices);

        let history = service(source).indicator_history("btcusd").await.unwrap();
        assert_eq!(history.len(), 60);
        assert!(history[18].sma_20.is_none());
        assert_relative_eq!(history[19].sma_20.unwrap(), 10.5);
        assert!(history[48].sma_50.is_none());
        assert_relative_eq!(history[59].sma_50.unwrap(), 35.5);
        assert_eq!(history[59].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_report_serializes_contract_fields() {
        let report = DcaSignalReport {
            signal: SignalKind::Hold,
            confidence: 0.2,
            reasoning: "Price is at its 20-day average".into(),
            current_price: 1.0,
            sma_20: 1.0,
            sma_50: 1.0,
            rsi: 50.0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["signal"], "HOLD");
        assert_eq!(json["sma_50"], 1.0);
    }
}
