//! Per-coin scan orchestration for the binary
//!
//! Each coin runs as a blocking task: load `<COIN>.csv`, write
//! `<COIN>_enriched.csv`, upsert alerts into the shared store. Coins without
//! a history file are skipped with a warning.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::SentinelError;
use crate::persistence::{write_alerts, write_enriched, AlertStore, AlertSummary, CandleSource, CsvCandleSource};
use crate::scanner::AlertScanner;

pub const ALERTS_FILE: &str = "alerts.csv";

/// What one coin's scan produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinReport {
    pub coin: String,
    pub candles: usize,
    pub alerts: usize,
    pub new_alerts: usize,
    /// Spot-ETF proxies configured for the coin
    pub etfs: Vec<String>,
    pub enriched_path: PathBuf,
}

/// Outcome of a full run across the configured coins
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    /// Sorted by coin
    pub coins: Vec<CoinReport>,
    /// Coins with no history file
    pub skipped: Vec<String>,
    pub alerts_path: PathBuf,
    pub summary: AlertSummary,
}

/// Scan every configured coin in parallel and write the alert file
pub async fn run_scan(config: &AppConfig, store: Arc<AlertStore>) -> Result<ScanReport> {
    let source = Arc::new(CsvCandleSource::new(&config.tracker.data_dir));
    source
        .ensure_dir()
        .with_context(|| format!("Failed to create data dir {}", config.tracker.data_dir))?;
    let scanner = Arc::new(AlertScanner::new(config));

    let mut tasks = JoinSet::new();
    for coin in config.tracker.coin_list() {
        let source = Arc::clone(&source);
        let scanner = Arc::clone(&scanner);
        let store = Arc::clone(&store);
        let etfs = config.tracker.etfs_for_coin(&coin);
        tasks.spawn_blocking(move || {
            let result = scan_coin(&scanner, &source, &coin, &store)
                .map(|report| CoinReport { etfs, ..report });
            (coin, result)
        });
    }

    let mut coins = Vec::new();
    let mut skipped = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (coin, result) = joined.context("Coin scan task panicked")?;
        match result {
            Ok(report) => {
                info!(
                    coin = %report.coin,
                    candles = report.candles,
                    alerts = report.alerts,
                    new_alerts = report.new_alerts,
                    etfs = ?report.etfs,
                    "Coin scanned"
                );
                coins.push(report);
            }
            Err(SentinelError::MissingHistory { coin, path }) => {
                warn!(coin = %coin, path = %path.display(), "No candle history, skipping");
                skipped.push(coin);
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to scan {coin}")),
        }
    }
    coins.sort_by(|a, b| a.coin.cmp(&b.coin));
    skipped.sort();

    let alerts_path = source.data_dir().join(ALERTS_FILE);
    write_alerts(&alerts_path, &store.alerts())
        .with_context(|| format!("Failed to write {}", alerts_path.display()))?;

    let summary = store.summary(None, None);
    info!(
        total = summary.total_alerts,
        critical = summary.critical,
        high = summary.high,
        medium = summary.medium,
        low = summary.low,
        coins_affected = summary.coins_affected,
        path = %alerts_path.display(),
        "Alert summary"
    );

    Ok(ScanReport {
        coins,
        skipped,
        alerts_path,
        summary,
    })
}

fn scan_coin(
    scanner: &AlertScanner,
    source: &CsvCandleSource,
    coin: &str,
    store: &AlertStore,
) -> Result<CoinReport, SentinelError> {
    let candles = source.load(coin)?;
    let enriched = scanner.engine().enrich(&candles);

    let enriched_path = source.enriched_path_for(coin);
    write_enriched(&enriched_path, &enriched)?;

    let alerts = scanner.scan_enriched(&enriched);
    let total = alerts.len();
    let new_alerts = alerts.into_iter().filter(|a| store.upsert(a.clone())).count();

    Ok(CoinReport {
        coin: coin.to_string(),
        candles: candles.len(),
        alerts: total,
        new_alerts,
        etfs: Vec::new(),
        enriched_path,
    })
}
