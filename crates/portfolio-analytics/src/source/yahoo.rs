//! Yahoo Finance Price Source
//!
//! Daily closes from the public chart API
//! (`/v8/finance/chart/{symbol}?range=..&interval=1d`).

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::PriceSource;
use crate::config::YahooConfig;
use crate::error::{AnalyticsError, Result};
use crate::model::{AssetId, PricePoint};

/// Price source backed by the Yahoo Finance chart endpoint
pub struct YahooPriceSource {
    client: reqwest::Client,
    config: YahooConfig,
}

impl YahooPriceSource {
    pub fn new(config: YahooConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("portfolio-analytics/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// Upstream ticker for an asset
    pub const fn symbol(asset: AssetId) -> &'static str {
        match asset {
            AssetId::Vn30 => "E1VFVN30.VN",
            AssetId::Xautusd => "XAUT-USD",
            AssetId::Btcusd => "BTC-USD",
        }
    }

    fn chart_url(&self, asset: AssetId) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.config.base_url.trim_end_matches('/'),
            Self::symbol(asset),
            self.config.range
        )
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    #[instrument(skip(self))]
    async fn fetch_history(&self, asset: AssetId) -> Result<Vec<PricePoint>> {
        let url = self.chart_url(asset);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyticsError::Fetch(format!(
                "{} returned HTTP {status}",
                Self::symbol(asset)
            )));
        }

        let points = response.json::<ChartResponse>().await?.into_points()?;
        debug!(%asset, points = points.len(), "Fetched Yahoo chart");
        Ok(points)
    }

    fn name(&self) -> &str {
        "YahooFinance"
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Zip timestamps with closes, dropping null closes (non-trading days)
    fn into_points(self) -> Result<Vec<PricePoint>> {
        if let Some(err) = self.chart.error {
            return Err(AnalyticsError::Fetch(format!(
                "{}: {}",
                err.code, err.description
            )));
        }

        let result = self
            .chart
            .result
            .and_then(|mut results| results.pop())
            .ok_or_else(|| AnalyticsError::Fetch("chart response has no result".into()))?;

        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        let points = result
            .timestamp
            .into_iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                let date = DateTime::from_timestamp(ts, 0)?.date_naive();
                close.map(|price| PricePoint::new(date, price))
            })
            .collect();
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_chart_response_into_points() {
        let json = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "BTC-USD"},
                    "timestamp": [1704067200, 1704153600, 1704240000],
                    "indicators": {"quote": [{"close": [42280.2, null, 44950.5]}]}
                }],
                "error": null
            }
        }"#;
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        let points = response.into_points().unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn test_chart_error_is_fetch_error() {
        let json = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}}"#;
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(response.into_points(), Err(AnalyticsError::Fetch(_))));
    }

    #[test]
    fn test_chart_url() {
        let source = YahooPriceSource::new(YahooConfig {
            base_url: "http://localhost:9000/".into(),
            range: "1y".into(),
        })
        .unwrap();
        assert_eq!(
            source.chart_url(AssetId::Xautusd),
            "http://localhost:9000/v8/finance/chart/XAUT-USD?range=1y&interval=1d"
        );
    }
}
