//! Price Sources
//!
//! Upstream suppliers of daily price history. A source only fetches; caching,
//! timeouts and retries belong to [`crate::provider::PriceSeriesProvider`].

mod csv_file;
pub(crate) mod memory;
mod yahoo;

pub use csv_file::CsvPriceSource;
pub use memory::InMemoryPriceSource;
pub use yahoo::YahooPriceSource;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AnalyticsConfig, SourceKind};
use crate::error::Result;
use crate::model::{AssetId, PricePoint};

/// Price history source trait (Strategy pattern)
///
/// Implementations may return points unordered or with repeated dates; the
/// provider normalizes them into a [`crate::model::PriceSeries`].
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the full daily history for an asset
    async fn fetch_history(&self, asset: AssetId) -> Result<Vec<PricePoint>>;

    /// Source name for logs
    fn name(&self) -> &str;
}

/// Build the source selected by configuration
pub fn from_config(config: &AnalyticsConfig) -> Result<Arc<dyn PriceSource>> {
    let source: Arc<dyn PriceSource> = match config.source {
        SourceKind::Csv => Arc::new(CsvPriceSource::new(&config.data_dir)),
        SourceKind::Yahoo => Arc::new(YahooPriceSource::new(config.yahoo.clone())?),
        SourceKind::Memory => Arc::new(InMemoryPriceSource::sample()),
    };
    Ok(source)
}
