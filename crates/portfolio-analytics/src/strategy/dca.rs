//! Dollar-Cost Averaging Timing
//!
//! Maps an indicator snapshot to a BUY/HOLD/SELL decision for the next DCA
//! purchase. Rules, first match wins:
//!
//! | Kind | Price vs SMA20 | SMA20 vs SMA50 | RSI            |
//! |------|----------------|----------------|----------------|
//! | SELL | above          | above          | > overbought   |
//! | BUY  | below          | below          | < oversold     |
//! | BUY  | below          | any            | < mild dip     |
//! | HOLD | otherwise      |                |                |

use std::cmp::Ordering;

use crate::config::SignalThresholds;
use crate::model::{IndicatorSnapshot, Signal, SignalKind};

/// Deterministic classifier over [`IndicatorSnapshot`]s
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalClassifier {
    thresholds: SignalThresholds,
}

impl SignalClassifier {
    pub const fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    pub const fn thresholds(&self) -> SignalThresholds {
        self.thresholds
    }

    pub fn classify(&self, snapshot: &IndicatorSnapshot) -> Signal {
        let rule = self.matching_rule(snapshot);
        let kind = match rule {
            Rule::Overbought => SignalKind::Sell,
            Rule::Oversold | Rule::MildDip => SignalKind::Buy,
            Rule::NoMatch => SignalKind::Hold,
        };

        Signal {
            kind,
            confidence: self.confidence(snapshot),
            reasoning: self.reasoning(rule, snapshot),
            snapshot: *snapshot,
        }
    }

    fn matching_rule(&self, snapshot: &IndicatorSnapshot) -> Rule {
        let t = &self.thresholds;
        let price = snapshot.current_price;
        let uptrend = price > snapshot.sma_20 && snapshot.sma_20 > snapshot.sma_50;
        let downtrend = price < snapshot.sma_20 && snapshot.sma_20 < snapshot.sma_50;

        if uptrend && snapshot.rsi > t.overbought {
            Rule::Overbought
        } else if downtrend && snapshot.rsi < t.oversold {
            Rule::Oversold
        } else if price < snapshot.sma_20 && snapshot.rsi < t.mild_dip {
            Rule::MildDip
        } else {
            Rule::NoMatch
        }
    }

    /// Mean of the SMA20 deviation score and the RSI distance from 50
    pub fn confidence(&self, snapshot: &IndicatorSnapshot) -> f64 {
        let deviation = relative_deviation(snapshot.current_price, snapshot.sma_20).abs();
        let a = (deviation / self.thresholds.deviation_scale).min(1.0);
        let b = (snapshot.rsi - 50.0).abs() / 50.0;
        ((a + b) / 2.0).clamp(0.0, 1.0)
    }

    /// Explains the rule that fired, citing only the facets it checked
    fn reasoning(&self, rule: Rule, snapshot: &IndicatorSnapshot) -> String {
        let t = &self.thresholds;
        let price_part = price_vs_average(snapshot);
        let rsi = snapshot.rsi;

        match rule {
            Rule::Overbought => format!(
                "{price_part}, the 20-day average is above the 50-day average and RSI \
                 ({rsi:.1}) indicates overbought conditions"
            ),
            Rule::Oversold => format!(
                "{price_part}, the 20-day average is below the 50-day average and RSI \
                 ({rsi:.1}) indicates oversold conditions"
            ),
            Rule::MildDip => format!(
                "{price_part} and RSI ({rsi:.1}) is below {:.0}, a mild dip",
                t.mild_dip
            ),
            Rule::NoMatch => {
                let trend_part = match snapshot.sma_20.partial_cmp(&snapshot.sma_50) {
                    Some(Ordering::Greater) => "the 20-day average is above the 50-day average",
                    Some(Ordering::Less) => "the 20-day average is below the 50-day average",
                    _ => "the 20-day average is level with the 50-day average",
                };
                let momentum = if rsi > t.overbought {
                    "overbought"
                } else if rsi < t.oversold {
                    "oversold"
                } else if rsi < t.mild_dip {
                    "weak"
                } else {
                    "neutral"
                };
                format!(
                    "{price_part}, {trend_part} and RSI ({rsi:.1}) indicates {momentum} \
                     conditions; no timing rule matched"
                )
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rule {
    Overbought,
    Oversold,
    MildDip,
    NoMatch,
}

fn price_vs_average(snapshot: &IndicatorSnapshot) -> String {
    let deviation = relative_deviation(snapshot.current_price, snapshot.sma_20) * 100.0;
    match snapshot.current_price.partial_cmp(&snapshot.sma_20) {
        Some(Ordering::Greater) => format!("Price is {deviation:.2}% above its 20-day average"),
        Some(Ordering::Less) => format!("Price is {:.2}% below its 20-day average", -deviation),
        _ => "Price is at its 20-day average".to_string(),
    }
}

fn relative_deviation(price: f64, average: f64) -> f64 {
    if average == 0.0 {
        return 0.0;
    }
    (price - average) / average
}
