//! Risk Metrics
//!
//! Mean, sample volatility, cumulative return, historical VaR and expected
//! shortfall over a return series.
//!
//! VaR uses linear percentile interpolation over the sorted returns
//! (rank = (1 - c) * (m - 1)), the same convention as numpy's default
//! `percentile`. Nearest-rank VaR would differ at small sample sizes.

use crate::error::{AnalyticsError, Result};
use crate::model::RiskMetrics;

/// Computes [`RiskMetrics`] for a return series at a confidence level
#[derive(Clone, Copy, Debug)]
pub struct RiskMetricsEngine {
    confidence: f64,
}

impl RiskMetricsEngine {
    pub fn new(confidence: f64) -> Result<Self> {
        validate_confidence(confidence)?;
        Ok(Self { confidence })
    }

    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn compute(&self, returns: &[f64]) -> Result<RiskMetrics> {
        ensure_len(returns)?;

        let mut sorted = returns.to_vec();
        sorted.sort_by(f64::total_cmp);
        let cutoff = quantile(&sorted, 1.0 - self.confidence);

        Ok(RiskMetrics {
            var: (-cutoff).max(0.0),
            mean_return: mean(returns),
            volatility: sample_std(returns),
            cumulative_return: cumulative_return(returns),
            expected_shortfall: shortfall_below(&sorted, cutoff),
        })
    }
}

/// Historical-simulation VaR as a non-negative loss fraction
pub fn historical_var(returns: &[f64], confidence: f64) -> Result<f64> {
    Ok(RiskMetricsEngine::new(confidence)?.compute(returns)?.var)
}

#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with divisor `m - 1`; zero for fewer than two values
#[allow(clippy::cast_precision_loss)]
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let ss: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Compounded return `prod(1 + r) - 1`
pub fn cumulative_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Linearly interpolated quantile of an ascending slice, `p` in [0, 1]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = p.clamp(0.0, 1.0) * (len - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + frac * (sorted[hi] - sorted[lo])
        }
    }
}

/// Mean loss over returns at or below `cutoff`, floored at zero
fn shortfall_below(sorted: &[f64], cutoff: f64) -> f64 {
    let tail_len = sorted.partition_point(|r| *r <= cutoff).max(1);
    (-mean(&sorted[..tail_len])).max(0.0)
}

fn ensure_len(returns: &[f64]) -> Result<()> {
    if returns.len() < 2 {
        return Err(AnalyticsError::InsufficientData {
            needed: 2,
            available: returns.len(),
        });
    }
    Ok(())
}

fn validate_confidence(confidence: f64) -> Result<()> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidConfidenceLevel(confidence))
    }
}
