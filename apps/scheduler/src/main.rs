use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use dotenv::dotenv;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appointment_cell::{PostgresBookingStore, RolloverService};
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let run_once = std::env::args().skip(1).any(|arg| arg == "--once");

    info!("Starting clinic scheduler");

    let config = AppConfig::from_env();
    if !config.is_configured() {
        bail!("DATABASE_URL must be set");
    }

    let store = PostgresBookingStore::connect(&config).await?;
    let rollover = RolloverService::new(Arc::new(store));

    if run_once {
        run_pass(&rollover).await;
        return Ok(());
    }

    let mut ticker = interval(config.rollover_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Rolling over elapsed slots every {:?}", config.rollover_interval());

    loop {
        tokio::select! {
            _ = ticker.tick() => run_pass(&rollover).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping scheduler");
                return Ok(());
            }
        }
    }
}

async fn run_pass(rollover: &RolloverService) {
    match rollover.roll_over_all_doctors(Utc::now()).await {
        Ok(completed) if completed.is_empty() => info!("Rollover pass finished, nothing to complete"),
        Ok(completed) => info!("Rollover pass completed {} appointments", completed.len()),
        Err(e) if e.is_retryable() => warn!("Rollover pass failed, retrying next tick: {}", e),
        Err(e) => error!("Rollover pass failed: {}", e),
    }
}
