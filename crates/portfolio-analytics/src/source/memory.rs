//! In-Memory Price Source
//!
//! For testing and demo purposes. Serves fixed series, or a deterministic
//! synthetic history for every asset.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use super::PriceSource;
use crate::error::{AnalyticsError, Result};
use crate::model::{AssetId, PricePoint};

const SAMPLE_DAYS: i64 = 180;

/// Price source backed by a map of prepared series
#[derive(Clone, Debug, Default)]
pub struct InMemoryPriceSource {
    series: HashMap<AssetId, Vec<PricePoint>>,
}

impl InMemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the series for an asset
    #[must_use]
    pub fn with_series(mut self, asset: AssetId, points: Vec<PricePoint>) -> Self {
        self.series.insert(asset, points);
        self
    }

    /// Add a series from consecutive daily prices starting at `start`
    #[must_use]
    pub fn with_daily_prices(self, asset: AssetId, start: NaiveDate, prices: &[f64]) -> Self {
        let points = daily_points(start, prices);
        self.with_series(asset, points)
    }

    /// Deterministic synthetic history for all configured assets
    pub fn sample() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        AssetId::ALL.into_iter().fold(Self::new(), |source, asset| {
            let (base, drift, swing) = sample_shape(asset);
            let prices: Vec<f64> = (0..SAMPLE_DAYS)
                .map(|day| {
                    #[allow(clippy::cast_precision_loss)]
                    let t = day as f64;
                    base * (1.0 + drift * t) * (1.0 + swing * (t / 9.0).sin())
                })
                .collect();
            source.with_daily_prices(asset, start, &prices)
        })
    }
}

/// (base price, daily drift, oscillation amplitude)
const fn sample_shape(asset: AssetId) -> (f64, f64, f64) {
    match asset {
        AssetId::Vn30 => (22.5, 0.0004, 0.03),
        AssetId::Xautusd => (2050.0, 0.0006, 0.02),
        AssetId::Btcusd => (42_000.0, 0.0015, 0.08),
    }
}

/// Consecutive calendar days starting at `start`
pub(crate) fn daily_points(start: NaiveDate, prices: &[f64]) -> Vec<PricePoint> {
    prices
        .iter()
        .zip(0_i64..)
        .map(|(&price, offset)| PricePoint::new(start + Duration::days(offset), price))
        .collect()
}

#[async_trait]
impl PriceSource for InMemoryPriceSource {
    async fn fetch_history(&self, asset: AssetId) -> Result<Vec<PricePoint>> {
        self.series
            .get(&asset)
            .cloned()
            .ok_or_else(|| AnalyticsError::Config(format!("no in-memory series for {asset}")))
    }

    fn name(&self) -> &str {
        "InMemory"
    }
}
