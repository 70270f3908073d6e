//! Technical Indicators
//!
//! Simple moving averages and RSI, evaluated at the latest index of a series.
//!
//! RSI here averages the gains and losses of the last `period` daily changes
//! (the seed step of Wilder's method, without the recursive smoothing):
//!
//! ```text
//! RS  = avg_gain / avg_loss
//! RSI = 100 - 100 / (1 + RS)
//! avg_loss == 0, avg_gain > 0  =>  100
//! avg_loss == 0, avg_gain == 0 =>  50   (no movement)
//! ```

use crate::config::IndicatorWindows;
use crate::error::{AnalyticsError, Result};
use crate::metrics::returns::ensure_positive;
use crate::model::{IndicatorSnapshot, PriceSeries};

const NEUTRAL_RSI: f64 = 50.0;

/// Computes indicator snapshots for a single asset
#[derive(Clone, Copy, Debug, Default)]
pub struct IndicatorEngine {
    windows: IndicatorWindows,
}

impl IndicatorEngine {
    pub const fn new(windows: IndicatorWindows) -> Self {
        Self { windows }
    }

    pub const fn windows(&self) -> IndicatorWindows {
        self.windows
    }

    /// Minimum series length for a fully defined snapshot
    pub fn required_len(&self) -> usize {
        self.windows
            .sma_long
            .max(self.windows.sma_short)
            .max(self.windows.rsi + 1)
    }

    /// SMA(short), SMA(long) and RSI at the last price
    pub fn snapshot(&self, series: &PriceSeries) -> Result<IndicatorSnapshot> {
        let needed = self.required_len();
        if series.len() < needed {
            return Err(AnalyticsError::InsufficientData {
                needed,
                available: series.len(),
            });
        }

        let window = &series.points()[series.len() - needed..];
        window.iter().try_for_each(ensure_positive)?;
        let prices: Vec<f64> = window.iter().map(|p| p.price).collect();

        let insufficient = || AnalyticsError::InsufficientData {
            needed,
            available: series.len(),
        };

        Ok(IndicatorSnapshot {
            current_price: series.last().price,
            sma_20: sma(&prices, self.windows.sma_short).ok_or_else(insufficient)?,
            sma_50: sma(&prices, self.windows.sma_long).ok_or_else(insufficient)?,
            rsi: rsi(&prices, self.windows.rsi).ok_or_else(insufficient)?,
        })
    }
}

/// Mean of the last `window` prices
#[allow(clippy::cast_precision_loss)]
pub fn sma(prices: &[f64], window: usize) -> Option<f64> {
    if window == 0 || prices.len() < window {
        return None;
    }
    let tail = &prices[prices.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// SMA at every index; `None` until `window` prices are available
#[allow(clippy::cast_precision_loss)]
pub fn rolling_sma(prices: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; prices.len()];
    }
    (0..prices.len())
        .map(|end| {
            (end + 1 >= window)
                .then(|| prices[end + 1 - window..=end].iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// RSI over the last `period` changes; needs `period + 1` prices
#[allow(clippy::cast_precision_loss)]
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let tail = &prices[prices.len() - period - 1..];
    let (gains, losses) = tail
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    let value = if avg_loss == 0.0 {
        if avg_gain > 0.0 { 100.0 } else { NEUTRAL_RSI }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };
    Some(value.clamp(0.0, 100.0))
}
