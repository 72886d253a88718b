//! EdgeX Trader - Main Entry Point
//!
//! Runs the control loop against the paper venue, fed by Binance prices,
//! until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use edgex_trader::config::load_config;
use edgex_trader::common::channels::create_shutdown_channel;
use edgex_trader::{
    BinanceMarketSource, CheckpointStore, ControlLoop, HttpDecisionClient, MarketContextCache,
    PaperVenue, TradingLedger,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "BOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true);

    if json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    } else {
        builder.try_init().map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = load_config(Some(&args.config)).context("loading configuration")?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.settings.log_level.clone());
    init_tracing(&level, args.json_logs || config.settings.json_logs)?;

    info!("Starting EdgeX trader for {}", config.trading.ticker);
    info!("Configuration file: {}", args.config);

    let binance = Arc::new(BinanceMarketSource::new(&config.external_market)?);
    let venue = Arc::new(PaperVenue::new(binance.clone(), config.venue.clone()));
    let decisions = Arc::new(HttpDecisionClient::new(&config.decision)?);
    let market = MarketContextCache::new(
        binance,
        config.external_market.ttl(),
        config.external_market.timeout(),
        config.external_market.enabled,
    );

    let mut ledger = TradingLedger::new(config.risk.clone(), Utc::now());
    let store = config
        .checkpoint
        .enabled
        .then(|| CheckpointStore::new(&config.checkpoint.path));
    if let Some(store) = &store {
        let max_age = chrono::Duration::minutes(config.checkpoint.max_age_minutes);
        match ledger.restore(store, Utc::now(), max_age).await {
            Ok(true) => info!("Checkpoint restored from {}", store.path().display()),
            Ok(false) => info!("Starting with a fresh ledger"),
            Err(e) => warn!("Ignoring checkpoint: {}", e),
        }
    }

    let mut control = ControlLoop::new(config, venue, decisions, market).with_ledger(ledger);
    if let Some(store) = store {
        control = control.with_checkpoint(store);
    }

    let (shutdown, signal) = create_shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, finishing current cycle...");
        }
        shutdown.trigger();
    });

    control.run(signal).await;
    info!("Shutdown complete");

    Ok(())
}
