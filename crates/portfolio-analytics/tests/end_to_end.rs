//! End-to-end runs through the public service API.

use std::sync::Arc;

use approx::assert_relative_eq;
use chrono::NaiveDate;

use portfolio_analytics::source::InMemoryPriceSource;
use portfolio_analytics::{
    AnalyticsConfig, AnalyticsError, AnalyticsService, AssetId, FetchPolicy,
    PriceSeriesProvider, SignalKind,
};

fn service(source: InMemoryPriceSource) -> AnalyticsService {
    let provider = PriceSeriesProvider::new(Arc::new(source), FetchPolicy::default());
    AnalyticsService::new(Arc::new(provider), &AnalyticsConfig::default())
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

const VN30: [f64; 5] = [22.10, 22.45, 22.30, 22.80, 23.05];
const GOLD: [f64; 5] = [2330.0, 2345.5, 2320.0, 2360.25, 2371.0];
const BTC: [f64; 5] = [68_000.0, 69_250.0, 67_100.0, 70_400.0, 71_050.0];

fn five_day_source() -> InMemoryPriceSource {
    InMemoryPriceSource::new()
        .with_daily_prices(AssetId::Vn30, start(), &VN30)
        .with_daily_prices(AssetId::Xautusd, start(), &GOLD)
        .with_daily_prices(AssetId::Btcusd, start(), &BTC)
}

#[tokio::test]
async fn test_portfolio_value_curve_matches_manual_compounding() {
    let report = service(five_day_source())
        .calculate_portfolio_risk(&[0.5, 0.3, 0.2], Some(0.95))
        .await
        .unwrap();

    let weights = [0.5, 0.3, 0.2];
    let returns: Vec<f64> = (1..5)
        .map(|t| {
            [VN30, GOLD, BTC]
                .iter()
                .zip(weights)
                .map(|(p, w)| w * (p[t] - p[t - 1]) / p[t - 1])
                .sum::<f64>()
        })
        .collect();

    assert_eq!(report.portfolio_values.len(), 4);
    assert_eq!(report.portfolio_values[0].date, start().succ_opt().unwrap());
    assert_relative_eq!(report.portfolio_values[0].value, 100.0);

    let mut expected = 100.0;
    for t in 1..4 {
        expected *= 1.0 + returns[t];
        assert_relative_eq!(report.portfolio_values[t].value, expected, epsilon = 1e-9);
    }

    let compounded = returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
    assert_relative_eq!(report.cumulative_return, compounded, epsilon = 1e-12);
    assert_relative_eq!(report.mean_return, returns.iter().sum::<f64>() / 4.0, epsilon = 1e-12);
    assert!(report.expected_shortfall >= report.var);
}

#[tokio::test]
async fn test_unknown_asset_and_short_history() {
    let svc = service(five_day_source());

    assert!(matches!(
        svc.get_dca_signal("ethusd").await,
        Err(AnalyticsError::UnknownAsset(_))
    ));
    // five days cannot support a 50-day average
    assert!(matches!(
        svc.get_dca_signal("vn30").await,
        Err(AnalyticsError::InsufficientData { needed: 50, available: 5 })
    ));
}

#[tokio::test]
async fn test_dca_signal_on_pullback() {
    // long uptrend, then a short sharp pullback below the 20-day average
    let mut prices: Vec<f64> = (0..55).map(|i| 100.0 + f64::from(i)).collect();
    prices.extend([150.0, 145.0, 140.0, 135.0, 130.0]);

    let source = InMemoryPriceSource::new().with_daily_prices(AssetId::Xautusd, start(), &prices);
    let report = service(source).get_dca_signal("xautusd").await.unwrap();

    assert!(report.current_price < report.sma_20);
    assert!(report.rsi < 40.0);
    assert_eq!(report.signal, SignalKind::Buy);
    assert!((0.0..=1.0).contains(&report.confidence));
}

#[tokio::test]
async fn test_historical_table_and_catalog() {
    let svc = service(five_day_source());

    let rows = svc.historical_prices().await.unwrap();
    assert_eq!(rows.len(), 5);
    assert_relative_eq!(rows[4].btcusd, 71_050.0);

    let json = serde_json::to_value(&rows[0]).unwrap();
    assert_eq!(json["date"], "2024-06-03");
    assert_eq!(json["vn30"], 22.10);

    let ids: Vec<_> = svc.list_assets().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, AssetId::ALL);
}
