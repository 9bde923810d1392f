use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use arb_core::config_loader::ConfigLoader;
use arb_core::oracle::StaticPriceOracle;
use arb_core::venue::{SystemClock, Venue};
use arb_engine::ArbEngine;
use clap::{Parser, Subcommand};
use rust_decimal_macros::dec;
use venue_mock::MockVenue;

#[derive(Parser)]
#[command(name = "arb-engine")]
#[command(about = "Cross-exchange spot arbitrage engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Loads config, wires paper-trading venues, and runs the engine until stopped.
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: PathBuf,
    },
    /// Loads and validates a config file without starting the engine.
    ValidateConfig {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run(&config).await,
        Commands::ValidateConfig { config } => validate_config(&config),
    }
}

/// Real venue connectors are out of this repo's scope; `run` wires the
/// engine against two in-memory `MockVenue`s so the full analyze → risk
/// gate → execute → balance pool loop can be driven end to end in paper
/// mode from a config file.
async fn run(config_path: &Path) -> anyhow::Result<()> {
    let path = config_path.to_str().context("config path is not valid UTF-8")?;
    let config = ConfigLoader::load_from(path).context("loading config")?;
    tracing::info!(pairs = config.trading_pairs.len(), "starting engine");

    let venue_a: Arc<dyn Venue> = Arc::new(MockVenue::new(config.exchange_a.name.clone()));
    let venue_b: Arc<dyn Venue> = Arc::new(MockVenue::new(config.exchange_b.name.clone()));
    let oracle = Arc::new(StaticPriceOracle::new().with_price("USDT", dec!(1)).with_price("USD", dec!(1)));
    let clock = Arc::new(SystemClock);

    let engine = Arc::new(
        ArbEngine::bootstrap(config, venue_a.clone(), venue_b.clone(), oracle, clock)
            .await
            .context("bootstrapping engine")?,
    );

    // The balance-pool update is an independent periodic task, separate from
    // the main trading loop, per the engine's concurrency model.
    let refresh_engine = engine.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            interval.tick().await;
            if let Err(err) = refresh_engine.refresh_balance_pool(&venue_a, &venue_b, chrono::Utc::now()).await {
                tracing::warn!(%err, "balance pool refresh failed");
            }
        }
    });

    let status = engine.run().await;
    tracing::info!(?status, "engine stopped");
    Ok(())
}

fn validate_config(config_path: &Path) -> anyhow::Result<()> {
    let path = config_path.to_str().context("config path is not valid UTF-8")?;
    let config = ConfigLoader::load_from(path).context("loading config")?;
    println!(
        "config OK: {} trading pair(s), venues {}/{}",
        config.trading_pairs.len(),
        config.exchange_a.name,
        config.exchange_b.name
    );
    Ok(())
}
