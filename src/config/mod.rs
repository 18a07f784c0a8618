//! Configuration management for Volume Sentinel
//!
//! Loads from TOML files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::SentinelError;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tracker: TrackerConfig,
    pub features: FeaturesConfig,
    pub detection: DetectionConfig,
    pub severity: SeverityConfig,
    pub futures: FuturesConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("tracker.coins", vec!["BTC", "ETH", "SOL", "NEAR", "LINK", "AAVE"])?
            .set_default("tracker.data_dir", "data")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (SENTINEL_*)
            .add_source(
                Environment::with_prefix("SENTINEL")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("tracker.coins")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Reject threshold combinations the detectors cannot work with
    pub fn validate(&self) -> std::result::Result<(), SentinelError> {
        let invalid = |msg: &str| Err(SentinelError::InvalidConfig(msg.to_string()));

        let f = &self.features;
        if f.rsi_period == 0
            || f.macd_fast == 0
            || f.macd_slow == 0
            || f.macd_signal == 0
            || f.bb_period == 0
            || f.volume_zscore_window == 0
            || f.divergence_lookback == 0
        {
            return invalid("indicator periods must be positive");
        }
        if f.macd_fast >= f.macd_slow {
            return invalid("features.macd_fast must be shorter than features.macd_slow");
        }

        let w = &self.detection.whale;
        if !(w.small > 0.0 && w.small < w.medium && w.medium < w.large && w.large < w.mega) {
            return invalid("detection.whale tiers must be positive and strictly ascending");
        }
        let d = &self.detection;
        if d.rsi_oversold >= d.rsi_overbought {
            return invalid("detection.rsi_oversold must be below detection.rsi_overbought");
        }
        if d.volume_zscore_threshold <= 0.0 {
            return invalid("detection.volume_zscore_threshold must be positive");
        }
        if d.divergence_lookback == 0 || d.divergence_lookback > d.divergence_history {
            return invalid("detection.divergence_lookback must be between 1 and detection.divergence_history");
        }

        let s = &self.severity;
        if !(s.medium_zscore <= s.high_zscore && s.high_zscore <= s.critical_zscore) {
            return invalid("severity z-score cutoffs must be ordered medium <= high <= critical");
        }

        let fu = &self.futures;
        if fu.premium > fu.premium_severe || fu.funding_annualized > fu.funding_annualized_severe {
            return invalid("futures severe thresholds must not be below their base thresholds");
        }
        if fu.assumed_leverage <= 0.0 {
            return invalid("futures.assumed_leverage must be positive");
        }

        if self.tracker.coin_list().is_empty() {
            return invalid("tracker.coins must name at least one coin");
        }
        if self.tracker.scan_days == 0 {
            return invalid("tracker.scan_days must be positive");
        }

        Ok(())
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "coins={:?} data_dir={} history_days={} scan_days={} z>{:.2} whales={}/{}/{}/{}",
            self.tracker.coin_list(),
            self.tracker.data_dir,
            self.tracker.history_days,
            self.tracker.scan_days,
            self.detection.volume_zscore_threshold,
            self.detection.whale.small,
            self.detection.whale.medium,
            self.detection.whale.large,
            self.detection.whale.mega,
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
