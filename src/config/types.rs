//! Configuration sections for the engine and the tracker

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coins to track and where their data lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Base assets to track
    pub coins: Vec<String>,
    /// Spot-ETF proxies per coin, e.g. "BTC=IBIT|FBTC,ETH=ETHA"
    pub etf_volume: String,
    /// Directory holding `<COIN>.csv` histories and scan output
    pub data_dir: String,
    /// Trailing days handed to the detector as baseline
    pub history_days: usize,
    /// Most recent days a scan re-evaluates
    pub scan_days: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            coins: ["BTC", "ETH", "SOL", "NEAR", "LINK", "AAVE"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            etf_volume: "BTC=IBIT,ETH=ETHA".to_string(),
            data_dir: "data".to_string(),
            history_days: 30,
            scan_days: 7,
        }
    }
}

impl TrackerConfig {
    /// Normalized (trimmed, uppercase, non-empty) coin list
    pub fn coin_list(&self) -> Vec<String> {
        self.coins
            .iter()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Coin -> ETF tickers, parsed from `etf_volume`
    pub fn etf_mappings(&self) -> BTreeMap<String, Vec<String>> {
        let mut mappings = BTreeMap::new();
        for item in self.etf_volume.split(',') {
            let Some((coin, etfs)) = item.trim().split_once('=') else {
                continue;
            };
            let tickers: Vec<String> = etfs
                .split('|')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
            if !tickers.is_empty() {
                mappings.insert(coin.trim().to_uppercase(), tickers);
            }
        }
        mappings
    }

    /// ETF tickers for one coin, empty if none configured
    pub fn etfs_for_coin(&self, coin: &str) -> Vec<String> {
        self.etf_mappings()
            .remove(&coin.to_uppercase())
            .unwrap_or_default()
    }
}

/// Indicator periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// RSI period
    pub rsi_period: usize,
    /// MACD fast period
    pub macd_fast: usize,
    /// MACD slow period
    pub macd_slow: usize,
    /// MACD signal period
    pub macd_signal: usize,
    /// Bollinger Bands period
    pub bb_period: usize,
    /// Bollinger Bands width in standard deviations
    pub bb_std_dev: f64,
    /// Rolling window for the volume Z-score column
    pub volume_zscore_window: usize,
    /// Days between the two closes compared for divergence
    pub divergence_lookback: usize,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std_dev: 2.0,
            volume_zscore_window: 20,
            divergence_lookback: 4,
        }
    }
}

/// USD thresholds for whale size classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhaleTiers {
    pub small: f64,
    pub medium: f64,
    pub large: f64,
    pub mega: f64,
}

impl Default for WhaleTiers {
    fn default() -> Self {
        Self {
            small: 500_000.0,
            medium: 1_000_000.0,
            large: 5_000_000.0,
            mega: 10_000_000.0,
        }
    }
}

/// Thresholds for the spot anomaly detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub whale: WhaleTiers,
    /// |z| above this is a volume anomaly (~99% confidence)
    pub volume_zscore_threshold: f64,
    /// Minimum historical points before volume baselining
    pub min_history: usize,
    /// Historical points joined with the current day for divergence
    pub divergence_history: usize,
    /// Days between the two closes compared by the divergence rule
    pub divergence_lookback: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            whale: WhaleTiers::default(),
            volume_zscore_threshold: 2.5,
            min_history: 10,
            divergence_history: 5,
            divergence_lookback: 4,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
        }
    }
}

/// Z-score cutoffs used by the severity cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    pub critical_zscore: f64,
    pub high_zscore: f64,
    pub medium_zscore: f64,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            critical_zscore: 3.5,
            high_zscore: 3.0,
            medium_zscore: 2.5,
        }
    }
}

/// Futures premium and funding thresholds (percent values)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuturesConfig {
    /// |premium| above this raises a premium/discount alert
    pub premium: f64,
    /// |premium| above this upgrades the alert to high
    pub premium_severe: f64,
    /// |annualized funding| above this raises a funding alert
    pub funding_annualized: f64,
    /// |annualized funding| above this upgrades the alert to critical
    pub funding_annualized_severe: f64,
    /// |premium| needed for contango / backwardation
    pub basis_premium: f64,
    /// |raw funding rate| needed for contango / backwardation
    pub basis_funding: f64,
    /// Leverage assumed for liquidation zone estimates
    pub assumed_leverage: f64,
}

impl Default for FuturesConfig {
    fn default() -> Self {
        Self {
            premium: 0.5,
            premium_severe: 1.0,
            funding_annualized: 50.0,
            funding_annualized_severe: 100.0,
            basis_premium: 0.3,
            basis_funding: 0.01,
            assumed_leverage: 10.0,
        }
    }
}
