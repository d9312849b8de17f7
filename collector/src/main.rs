//! RateDesk Collector Binary
//!
//! Keeps the rate store current by pulling the upstream daily bulletin on a
//! fixed interval and merging each sheet through the refresh coordinator.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratedesk_core::SystemClock;
use ratedesk_engine::{HttpSheetProvider, MemoryRateStore, RateService, SheetProvider};

use ratedesk_collector::CollectorConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting RateDesk Collector");

    // Load configuration
    let config = CollectorConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let clock = Arc::new(SystemClock);
    let provider = Arc::new(
        HttpSheetProvider::with_config(config.provider_config(), clock.clone())
            .map_err(|e| anyhow::anyhow!("Provider construction failed: {}", e))?,
    );
    let service = Arc::new(RateService::with_config(
        Arc::new(config.registry()),
        Arc::new(MemoryRateStore::new()),
        provider as Arc<dyn SheetProvider>,
        clock,
        config.service_config(),
    ));

    info!(
        base = %config.base_code,
        currencies = config.currencies.len(),
        bulletin_url = %config.bulletin_url,
        refresh_interval_secs = config.refresh_interval.as_secs(),
        "Collector configured"
    );

    // First pass at startup. A failure here is retried on the next tick, so
    // the process stays up through an upstream outage.
    match service.refresh().await {
        Ok(outcome) => info!(
            sheet_date = %outcome.sheet_date,
            inserted = outcome.inserted,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            "Startup refresh complete"
        ),
        Err(e) => warn!(error = %e, "Startup refresh failed"),
    }

    let mut ticker = tokio::time::interval(config.refresh_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                match service.refresh().await {
                    Ok(outcome) => info!(
                        sheet_date = %outcome.sheet_date,
                        inserted = outcome.inserted,
                        updated = outcome.updated,
                        unchanged = outcome.unchanged,
                        "Scheduled refresh complete"
                    ),
                    Err(e) => warn!(error = %e, "Scheduled refresh failed"),
                }
            }
        }
    }

    info!("Collector shutdown complete");
    Ok(())
}
