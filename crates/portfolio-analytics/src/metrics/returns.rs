//! Return Calculation

use crate::error::{AnalyticsError, Result};
use crate::model::{PricePoint, PriceSeries, ReturnSeries};

/// Simple returns `(p[t] - p[t-1]) / p[t-1]`, one per consecutive price pair
pub fn simple_returns(series: &PriceSeries) -> Result<ReturnSeries> {
    pairwise(series.points(), |prev, curr| (curr - prev) / prev)
}

/// Log returns `ln(p[t] / p[t-1])`
pub fn log_returns(series: &PriceSeries) -> Result<ReturnSeries> {
    pairwise(series.points(), |prev, curr| (curr / prev).ln())
}

/// Apply `f(prev, curr)` over consecutive points.
///
/// Every divisor is checked; the current price is checked too so that a bad
/// last point is reported rather than turned into a -100% return.
pub(crate) fn pairwise<F>(points: &[PricePoint], f: F) -> Result<ReturnSeries>
where
    F: Fn(f64, f64) -> f64,
{
    if points.len() < 2 {
        return Err(AnalyticsError::InsufficientData {
            needed: 2,
            available: points.len(),
        });
    }

    let mut dates = Vec::with_capacity(points.len() - 1);
    let mut values = Vec::with_capacity(points.len() - 1);
    for pair in points.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        ensure_positive(prev)?;
        ensure_positive(curr)?;
        dates.push(curr.date);
        values.push(f(prev.price, curr.price));
    }
    Ok(ReturnSeries { dates, values })
}

pub(crate) fn ensure_positive(point: &PricePoint) -> Result<()> {
    if point.price.is_finite() && point.price > 0.0 {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidPrice {
            date: point.date,
            price: point.price,
        })
    }
}
