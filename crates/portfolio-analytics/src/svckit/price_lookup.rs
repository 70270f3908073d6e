//! Price Lookup Service
//!
//! Asset catalog, single-asset price history and the aligned price table.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::Serialize;

use crate::error::Result;
use crate::metrics::AlignedPrices;
use crate::model::{AssetId, AssetInfo, PriceSeries};
use crate::provider::PriceSeriesProvider;

/// One row of the aligned price table
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HistoricalPriceRow {
    pub date: NaiveDate,
    pub vn30: f64,
    pub xautusd: f64,
    pub btcusd: f64,
}

/// Serves price data from the shared provider
pub struct PriceLookupService {
    provider: Arc<PriceSeriesProvider>,
}

impl PriceLookupService {
    pub fn new(provider: Arc<PriceSeriesProvider>) -> Self {
        Self { provider }
    }

    pub fn list_assets(&self) -> Vec<AssetInfo> {
        AssetId::ALL.into_iter().map(AssetInfo::from).collect()
    }

    /// Full daily history for an asset identifier such as `"btcusd"`
    pub async fn get_asset_prices(&self, asset: &str) -> Result<Arc<PriceSeries>> {
        let asset: AssetId = asset.parse()?;
        self.provider.get(asset).await
    }

    /// Prices of every asset on the dates they all share
    pub async fn historical_prices(&self) -> Result<Vec<HistoricalPriceRow>> {
        let series = fetch_all(&self.provider).await?;
        let refs: Vec<&PriceSeries> = series.iter().map(AsRef::as_ref).collect();
        let aligned = AlignedPrices::align(&refs)?;

        let column = |asset: AssetId, row: usize| aligned.columns[asset.index()][row];
        Ok(aligned
            .dates
            .iter()
            .enumerate()
            .map(|(row, date)| HistoricalPriceRow {
                date: *date,
                vn30: column(AssetId::Vn30, row),
                xautusd: column(AssetId::Xautusd, row),
                btcusd: column(AssetId::Btcusd, row),
            })
            .collect())
    }
}

/// Series for every asset in weight order, fetched concurrently
pub(crate) async fn fetch_all(provider: &PriceSeriesProvider) -> Result<Vec<Arc<PriceSeries>>> {
    try_join_all(AssetId::ALL.into_iter().map(|asset| provider.get(asset))).await
}
