//! Portfolio Aggregation
//!
//! Normalizes weights, aligns per-asset series on their common dates and
//! combines per-asset simple returns into one portfolio return series.

use chrono::NaiveDate;

use crate::error::{AnalyticsError, Result};
use crate::metrics::returns::simple_returns;
use crate::model::{PortfolioValuePoint, PricePoint, PriceSeries, ReturnSeries};

/// Base of the compounded value curve
pub const BASE_VALUE: f64 = 100.0;

/// Weights scaled to sum to one.
///
/// Fails `InvalidWeights` on a count mismatch, any negative or non-finite
/// weight, or a non-positive sum.
pub fn normalize_weights(raw: &[f64], expected_len: usize) -> Result<Vec<f64>> {
    if raw.len() != expected_len {
        return Err(AnalyticsError::InvalidWeights(format!(
            "expected {expected_len} weights, got {}",
            raw.len()
        )));
    }
    if let Some(bad) = raw.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(AnalyticsError::InvalidWeights(format!(
            "weights must be finite and non-negative, got {bad}"
        )));
    }

    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
        return Err(AnalyticsError::InvalidWeights(format!(
            "weights must sum to a positive value, got {sum}"
        )));
    }
    Ok(raw.iter().map(|w| w / sum).collect())
}

/// Prices of several assets restricted to the dates they all share
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedPrices {
    pub dates: Vec<NaiveDate>,
    /// One column per input series, in input order
    pub columns: Vec<Vec<f64>>,
}

impl AlignedPrices {
    /// Intersect the date sets of all series.
    ///
    /// Fails `InsufficientOverlap` with fewer than two common dates.
    pub fn align(series: &[&PriceSeries]) -> Result<Self> {
        let Some((head, rest)) = series.split_first() else {
            return Err(AnalyticsError::InsufficientOverlap { common: 0 });
        };

        let dates: Vec<NaiveDate> = head
            .dates()
            .filter(|d| rest.iter().all(|s| s.price_on(*d).is_some()))
            .collect();

        if dates.len() < 2 {
            return Err(AnalyticsError::InsufficientOverlap {
                common: dates.len(),
            });
        }

        let columns = series
            .iter()
            .map(|s| dates.iter().filter_map(|d| s.price_on(*d)).collect())
            .collect();

        Ok(Self { dates, columns })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Rebuild column `index` as a price series on the aligned dates
    pub fn column_series(&self, index: usize) -> Result<PriceSeries> {
        let column = self.columns.get(index).ok_or_else(|| {
            AnalyticsError::InvalidWeights(format!("no aligned column {index}"))
        })?;
        let points = self
            .dates
            .iter()
            .zip(column)
            .map(|(date, price)| PricePoint::new(*date, *price))
            .collect();
        PriceSeries::new(points)
    }
}

/// Portfolio return and value series for a weighted set of assets
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioAggregation {
    pub weights: Vec<f64>,
    pub aligned: AlignedPrices,
    /// Simple returns of each asset over the aligned dates, in input order
    pub asset_returns: Vec<ReturnSeries>,
    pub returns: ReturnSeries,
    pub values: Vec<PortfolioValuePoint>,
}

impl PortfolioAggregation {
    /// Normalize `raw_weights`, then aggregate
    pub fn build(series: &[&PriceSeries], raw_weights: &[f64]) -> Result<Self> {
        let weights = normalize_weights(raw_weights, series.len())?;
        Self::from_normalized(series, weights)
    }

    /// Aggregate with weights already produced by [`normalize_weights`]
    pub fn from_normalized(series: &[&PriceSeries], weights: Vec<f64>) -> Result<Self> {
        if weights.len() != series.len() {
            return Err(AnalyticsError::InvalidWeights(format!(
                "expected {} weights, got {}",
                series.len(),
                weights.len()
            )));
        }
        let aligned = AlignedPrices::align(series)?;

        let asset_returns = (0..series.len())
            .map(|i| simple_returns(&aligned.column_series(i)?))
            .collect::<Result<Vec<_>>>()?;

        // every column shares the aligned dates, so return t lines up across assets
        let dates = aligned.dates[1..].to_vec();
        let values = (0..dates.len())
            .map(|t| {
                asset_returns
                    .iter()
                    .zip(&weights)
                    .map(|(r, w)| w * r.values[t])
                    .sum::<f64>()
            })
            .collect::<Vec<_>>();

        let returns = ReturnSeries { dates, values };
        let values = value_series(&returns);
        Ok(Self {
            weights,
            aligned,
            asset_returns,
            returns,
            values,
        })
    }
}

/// Value curve starting at [`BASE_VALUE`] on the first return date.
///
/// `value[t] = value[t-1] * (1 + r[t])`, so the first return sets the base
/// date only and is not compounded into the curve.
pub fn value_series(returns: &ReturnSeries) -> Vec<PortfolioValuePoint> {
    let mut values = Vec::with_capacity(returns.len());
    let mut value = BASE_VALUE;
    for (t, (date, r)) in returns.dates.iter().zip(&returns.values).enumerate() {
        if t > 0 {
            value *= 1.0 + r;
        }
        values.push(PortfolioValuePoint { date: *date, value });
    }
    values
}

/// Pearson correlation of two equally long series
#[allow(clippy::cast_precision_loss)]
pub fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    (denom > f64::EPSILON).then(|| cov / denom)
}
