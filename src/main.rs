//! Volume Sentinel - scan configured coins and write alerts
//!
//! Usage: SENTINEL_LOG_JSON=1 RUST_LOG=debug cargo run --release

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use volume_sentinel::config::AppConfig;
use volume_sentinel::persistence::AlertStore;
use volume_sentinel::runner::run_scan;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(config = %config, "Volume Sentinel starting");

    let store = Arc::new(AlertStore::new());
    let report = run_scan(&config, store).await?;

    info!(
        scanned = report.coins.len(),
        skipped = report.skipped.len(),
        alerts = report.summary.total_alerts,
        path = %report.alerts_path.display(),
        "Scan complete"
    );

    Ok(())
}

/// Initialize logging, JSON lines when SENTINEL_LOG_JSON=1
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("SENTINEL_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
