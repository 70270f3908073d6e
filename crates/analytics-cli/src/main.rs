//! portfolio-analytics CLI
//!
//! Runs one analytics operation and prints the result as JSON on stdout.
//! Logs go to stderr.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portfolio_analytics::{AnalyticsConfig, AnalyticsError, AnalyticsService};

#[derive(Parser, Debug)]
#[command(
    name = "portfolio-analytics",
    version,
    about = "Portfolio risk and DCA timing signals"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the configured assets
    Assets,
    /// Daily price history for one asset
    Prices { asset: String },
    /// Prices of all assets on their common dates
    History,
    /// Portfolio VaR, volatility and value curve
    Risk {
        /// Weights in asset order (vn30, xautusd, btcusd)
        #[arg(long, value_delimiter = ',', num_args = 1.., required = true)]
        weights: Vec<f64>,
        /// VaR confidence level in (0, 1)
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// BUY/HOLD/SELL timing signal for one asset
    Signal { asset: String },
    /// Daily price with its 20- and 50-day moving averages
    Indicators { asset: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Command failed: {err:#}");
            let (status, body) = error_report(&err);
            println!("{body}");
            ExitCode::from(status)
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    let config = AnalyticsConfig::from_env().context("invalid analytics configuration")?;
    tracing::info!(source = ?config.source, "Starting portfolio-analytics");

    let service = AnalyticsService::from_config(&config)?;

    match command {
        Command::Assets => print_json(&service.list_assets()),
        Command::Prices { asset } => {
            let series = service
                .get_asset_prices(&asset)
                .await
                .with_context(|| format!("loading prices for {asset}"))?;
            print_json(&*series)
        }
        Command::History => print_json(&service.historical_prices().await?),
        Command::Risk {
            weights,
            confidence,
        } => print_json(
            &service
                .calculate_portfolio_risk(&weights, confidence)
                .await
                .context("calculating portfolio risk")?,
        ),
        Command::Signal { asset } => print_json(
            &service
                .get_dca_signal(&asset)
                .await
                .with_context(|| format!("computing DCA signal for {asset}"))?,
        ),
        Command::Indicators { asset } => print_json(
            &service
                .get_indicator_history(&asset)
                .await
                .with_context(|| format!("computing indicators for {asset}"))?,
        ),
    }
}

/// Exit status and JSON error body; 2 for bad input, 1 otherwise
fn error_report(err: &anyhow::Error) -> (u8, serde_json::Value) {
    let (status, code, message) = match err.downcast_ref::<AnalyticsError>() {
        Some(e) if e.is_client_error() => (2, e.code(), e.user_message()),
        Some(e) => (1, e.code(), e.user_message()),
        None => (1, "INTERNAL_ERROR", format!("{err:#}")),
    };
    let body = serde_json::json!({ "error": { "code": code, "message": message } });
    (status, body)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
