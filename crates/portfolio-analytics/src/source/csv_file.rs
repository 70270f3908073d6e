//! CSV File Price Source
//!
//! Reads `historical_prices_<SYMBOL>.csv` exports. Two layouts are accepted:
//! vnstock exports (`time,open,high,low,close,volume`) and yfinance exports,
//! whose first header cell is `Price` and which carry extra `Ticker`/`Date`
//! rows before the data. Rows whose date or close does not parse are skipped.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use super::PriceSource;
use crate::error::{AnalyticsError, Result};
use crate::model::{AssetId, PricePoint};

const DATE_COLUMNS: [&str; 4] = ["date", "time", "datetime", "price"];
const CLOSE_COLUMNS: [&str; 2] = ["close", "adj close"];

/// Price source reading one CSV file per asset from a directory
#[derive(Clone, Debug)]
pub struct CsvPriceSource {
    data_dir: PathBuf,
}

impl CsvPriceSource {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// File backing an asset
    pub fn path_for(&self, asset: AssetId) -> PathBuf {
        let symbol = match asset {
            AssetId::Vn30 => "E1VFVN30",
            AssetId::Xautusd => "XAUTUSD",
            AssetId::Btcusd => "BTCUSD",
        };
        self.data_dir.join(format!("historical_prices_{symbol}.csv"))
    }
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    async fn fetch_history(&self, asset: AssetId) -> Result<Vec<PricePoint>> {
        let path = self.path_for(asset);
        let raw = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                AnalyticsError::Config(format!("price file {} not found", path.display()))
            }
            _ => AnalyticsError::Io(e),
        })?;

        let points = parse_price_csv(&raw)?;
        debug!(%asset, file = %path.display(), rows = points.len(), "Loaded CSV prices");
        Ok(points)
    }

    fn name(&self) -> &str {
        "CsvFile"
    }
}

/// Parse a price export into points, skipping unparseable rows
pub fn parse_price_csv(raw: &[u8]) -> Result<Vec<PricePoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw);

    let headers = reader.headers()?.clone();
    let find = |candidates: &[&str]| {
        headers
            .iter()
            .position(|h| candidates.iter().any(|c| h.eq_ignore_ascii_case(c)))
    };

    let date_col = find(DATE_COLUMNS.as_slice()).unwrap_or(0);
    let close_col = find(CLOSE_COLUMNS.as_slice())
        .ok_or_else(|| AnalyticsError::Config("CSV has no close column".into()))?;

    let mut points = Vec::new();
    for record in reader.records() {
        let record = record?;
        let date = record.get(date_col).and_then(parse_date);
        let close = record.get(close_col).and_then(|c| c.parse::<f64>().ok());
        if let (Some(date), Some(price)) = (date, close) {
            points.push(PricePoint::new(date, price));
        }
    }
    Ok(points)
}

/// Accepts `YYYY-MM-DD` optionally followed by a time component
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
