//! Domain Models
//!
//! Value types shared by every analytics stage. Series are immutable once
//! built; stages hand each other borrowed views or `Arc`s, never `&mut`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AnalyticsError, Result};

/// A configured instrument.
///
/// The declaration order is the portfolio weight order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetId {
    Vn30,
    Xautusd,
    Btcusd,
}

impl AssetId {
    /// All assets in portfolio weight order
    pub const ALL: [Self; 3] = [Self::Vn30, Self::Xautusd, Self::Btcusd];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vn30 => "vn30",
            Self::Xautusd => "xautusd",
            Self::Btcusd => "btcusd",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Vn30 => "VN30",
            Self::Xautusd => "Gold (XAU/USD)",
            Self::Btcusd => "Bitcoin (BTC/USD)",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Vn30 => "Vietnam VN30 Index",
            Self::Xautusd => "Gold vs USD",
            Self::Btcusd => "Bitcoin vs USD",
        }
    }

    /// Position of this asset in a weight vector
    pub const fn index(self) -> usize {
        match self {
            Self::Vn30 => 0,
            Self::Xautusd => 1,
            Self::Btcusd => 2,
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetId {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "vn30" => Ok(Self::Vn30),
            "xautusd" => Ok(Self::Xautusd),
            "btcusd" => Ok(Self::Btcusd),
            _ => Err(AnalyticsError::UnknownAsset(s.to_string())),
        }
    }
}

/// Catalog entry describing an asset
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetInfo {
    pub id: AssetId,
    pub name: &'static str,
    pub description: &'static str,
}

impl From<AssetId> for AssetInfo {
    fn from(id: AssetId) -> Self {
        Self {
            id,
            name: id.name(),
            description: id.description(),
        }
    }
}

/// A single daily closing price
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub const fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Chronologically ordered daily prices with unique dates
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build from points that must already be strictly ascending by date
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(AnalyticsError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }
        if let Some(pair) = points.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(AnalyticsError::InvalidSeries(format!(
                "dates not strictly ascending at {}",
                pair[1].date
            )));
        }
        Ok(Self { points })
    }

    /// Sort by date and drop duplicate dates (the last point for a date wins)
    pub fn from_unsorted(mut points: Vec<PricePoint>) -> Result<Self> {
        // stable sort keeps input order within a date, so the last one is the latest
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }
        Self::new(deduped)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed series; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.price)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }

    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].price)
    }
}

/// Simple (or log) returns, each dated by the later day of its price pair
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReturnSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One point of the compounded portfolio value curve
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PortfolioValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Risk statistics over a portfolio return series
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RiskMetrics {
    /// Historical-simulation Value-at-Risk as a non-negative loss fraction
    pub var: f64,
    pub mean_return: f64,
    /// Sample standard deviation of returns
    pub volatility: f64,
    pub cumulative_return: f64,
    /// Mean loss beyond the VaR quantile (CVaR); never below `var`
    pub expected_shortfall: f64,
}

/// Indicator values at the latest index of a price series
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub current_price: f64,
    pub sma_20: f64,
    pub sma_50: f64,
    pub rsi: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Hold,
    Sell,
}

impl SignalKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DCA timing decision
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// In [0, 1]
    pub confidence: f64,
    pub reasoning: String,
    pub snapshot: IndicatorSnapshot,
}
