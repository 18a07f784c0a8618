//! Anomaly detection - whale flow, volume spikes, divergence, RSI extremes
//!
//! The spot detector looks at one current day against a trailing window and
//! produces untagged [`AlertDraft`]s. Severity is assigned afterwards by the
//! [`SeverityClassifier`]; futures alerts come pre-classified from the
//! [`FuturesAnomalyDetector`].

pub mod futures;
pub mod severity;

pub use futures::{FuturesAnomalyDetector, LiquidationEstimate};
pub use severity::SeverityClassifier;

use crate::config::DetectionConfig;
use crate::features::{compute_divergence, stats};
use crate::types::{AlertDraft, AlertType, Candle, DivergenceSignal, EnrichedCandle, SizeClass};

/// Spot anomaly detector
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: DetectionConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run every detector for `current` against its trailing `historical`
    /// window (ascending, not including `current`).
    ///
    /// Drafts come out in a fixed order: whale, volume, divergence, RSI.
    pub fn detect_all(&self, current: &EnrichedCandle, historical: &[EnrichedCandle]) -> Vec<AlertDraft> {
        let mut drafts = Vec::new();

        drafts.extend(self.detect_whales(&current.candle));
        drafts.extend(self.detect_volume_anomalies(&current.candle, historical));
        drafts.extend(self.detect_divergence(current, historical));
        drafts.extend(self.detect_rsi_extremes(current));

        tracing::debug!(
            coin = %current.candle.coin,
            date = %current.candle.date,
            history = historical.len(),
            drafts = drafts.len(),
            "AnomalyDetector::detect_all finished"
        );

        drafts
    }

    /// Highest whale tier reached by a USD value
    pub fn classify_whale_size(&self, usd_value: f64) -> Option<SizeClass> {
        let tiers = &self.config.whale;
        if usd_value >= tiers.mega {
            Some(SizeClass::MegaWhale)
        } else if usd_value >= tiers.large {
            Some(SizeClass::LargeWhale)
        } else if usd_value >= tiers.medium {
            Some(SizeClass::MediumWhale)
        } else if usd_value >= tiers.small {
            Some(SizeClass::SmallWhale)
        } else {
            None
        }
    }

    /// Whale-sized buy, sell and net flow on one day
    pub fn detect_whales(&self, candle: &Candle) -> Vec<AlertDraft> {
        let mut drafts = Vec::new();

        if let Some(size_class) = self.classify_whale_size(candle.buy_volume_usd) {
            let mut draft = AlertDraft::new(
                &candle.coin,
                candle.date,
                AlertType::WhaleBuy,
                format!("Large buy pressure detected: {}", format_usd(candle.buy_volume_usd)),
            );
            draft.size_class = Some(size_class);
            draft.value_usd = Some(candle.buy_volume_usd);
            draft.volume = Some(candle.buy_volume);
            draft.price = Some(candle.close);
            drafts.push(draft);
        }

        if let Some(size_class) = self.classify_whale_size(candle.sell_volume_usd) {
            let mut draft = AlertDraft::new(
                &candle.coin,
                candle.date,
                AlertType::WhaleSell,
                format!("Large sell pressure detected: {}", format_usd(candle.sell_volume_usd)),
            );
            draft.size_class = Some(size_class);
            draft.value_usd = Some(candle.sell_volume_usd);
            draft.volume = Some(candle.sell_volume);
            draft.price = Some(candle.close);
            drafts.push(draft);
        }

        let net_abs = candle.net_volume_usd.abs();
        if let Some(size_class) = self.classify_whale_size(net_abs) {
            let (alert_type, direction) = if candle.net_volume_usd > 0.0 {
                (AlertType::WhaleAccumulation, "accumulation")
            } else {
                (AlertType::WhaleDistribution, "distribution")
            };
            let mut draft = AlertDraft::new(
                &candle.coin,
                candle.date,
                alert_type,
                format!("Strong {direction}: {} net {direction}", format_usd(net_abs)),
            );
            draft.size_class = Some(size_class);
            draft.value_usd = Some(net_abs);
            draft.volume = Some(candle.net_volume.abs());
            draft.price = Some(candle.close);
            drafts.push(draft);
        }

        drafts
    }

    /// Z-score of `value` against `baseline` and whether it is anomalous.
    ///
    /// Baselines shorter than `min_history` never alert and score 0.
    pub fn volume_anomaly(&self, value: f64, baseline: &[f64]) -> (bool, f64) {
        if baseline.len() < self.config.min_history {
            return (false, 0.0);
        }
        let z = stats::zscore(value, baseline);
        (z.abs() > self.config.volume_zscore_threshold, z)
    }

    /// Total, buy and sell volume spikes against the trailing window.
    ///
    /// Buy and sell volume only alert on the upside.
    pub fn detect_volume_anomalies(&self, candle: &Candle, historical: &[EnrichedCandle]) -> Vec<AlertDraft> {
        let mut drafts = Vec::new();

        if historical.len() < self.config.min_history {
            tracing::debug!(
                coin = %candle.coin,
                date = %candle.date,
                history = historical.len(),
                required = self.config.min_history,
                "Volume anomaly: Not enough history"
            );
            return drafts;
        }

        let totals: Vec<f64> = historical.iter().map(|h| h.candle.total_volume).collect();
        let buys: Vec<f64> = historical.iter().map(|h| h.candle.buy_volume).collect();
        let sells: Vec<f64> = historical.iter().map(|h| h.candle.sell_volume).collect();

        let (is_anomaly, z) = self.volume_anomaly(candle.total_volume, &totals);
        if is_anomaly {
            let mut draft = AlertDraft::new(
                &candle.coin,
                candle.date,
                AlertType::VolumeSpike,
                format!("Unusual volume spike detected (Z-score: {z:.2})"),
            );
            draft.zscore = Some(stats::round_dp(z, 2));
            draft.volume = Some(candle.total_volume);
            draft.price = Some(candle.close);
            draft.metadata.avg_volume = Some(stats::mean(&totals));
            drafts.push(draft);
        }

        let (is_anomaly, z) = self.volume_anomaly(candle.buy_volume, &buys);
        if is_anomaly && z > 0.0 {
            let mut draft = AlertDraft::new(
                &candle.coin,
                candle.date,
                AlertType::BuyVolumeSpike,
                format!("Unusual buying activity (Z-score: {z:.2})"),
            );
            draft.zscore = Some(stats::round_dp(z, 2));
            draft.volume = Some(candle.buy_volume);
            draft.value_usd = Some(candle.buy_volume_usd);
            draft.price = Some(candle.close);
            drafts.push(draft);
        }

        let (is_anomaly, z) = self.volume_anomaly(candle.sell_volume, &sells);
        if is_anomaly && z > 0.0 {
            let mut draft = AlertDraft::new(
                &candle.coin,
                candle.date,
                AlertType::SellVolumeSpike,
                format!("Unusual selling activity (Z-score: {z:.2})"),
            );
            draft.zscore = Some(stats::round_dp(z, 2));
            draft.volume = Some(candle.sell_volume);
            draft.value_usd = Some(candle.sell_volume_usd);
            draft.price = Some(candle.close);
            drafts.push(draft);
        }

        drafts
    }

    /// Divergence on the current day, using the last `divergence_history`
    /// historical days plus today
    pub fn detect_divergence(&self, current: &EnrichedCandle, historical: &[EnrichedCandle]) -> Vec<AlertDraft> {
        let needed = self.config.divergence_history;
        if needed == 0 || historical.len() < needed {
            return Vec::new();
        }

        let recent = &historical[historical.len() - needed..];
        let series: Vec<&Candle> = recent
            .iter()
            .map(|h| &h.candle)
            .chain(std::iter::once(&current.candle))
            .collect();
        let closes: Vec<f64> = series.iter().map(|c| c.close).collect();
        let nets: Vec<f64> = series.iter().map(|c| c.net_volume).collect();

        let signal = compute_divergence(&closes, &nets, self.config.divergence_lookback)
            .last()
            .copied()
            .flatten();

        let candle = &current.candle;
        let (alert_type, description) = match signal {
            Some(DivergenceSignal::Bullish) => (
                AlertType::BullishDivergence,
                "Bullish divergence: Price declining but accumulation detected",
            ),
            Some(DivergenceSignal::Bearish) => (
                AlertType::BearishDivergence,
                "Bearish divergence: Price rising but distribution detected",
            ),
            _ => return Vec::new(),
        };

        let mut draft = AlertDraft::new(&candle.coin, candle.date, alert_type, description);
        draft.price = Some(candle.close);
        draft.metadata.net_volume = Some(candle.net_volume);
        vec![draft]
    }

    /// RSI oversold / overbought on the current day
    pub fn detect_rsi_extremes(&self, current: &EnrichedCandle) -> Vec<AlertDraft> {
        let Some(rsi) = current.rsi else {
            return Vec::new();
        };
        let candle = &current.candle;

        let (alert_type, description) = if rsi < self.config.rsi_oversold {
            (
                AlertType::RsiOversold,
                format!("RSI oversold at {rsi:.1} - potential buy zone"),
            )
        } else if rsi > self.config.rsi_overbought {
            (
                AlertType::RsiOverbought,
                format!("RSI overbought at {rsi:.1} - potential sell zone"),
            )
        } else {
            return Vec::new();
        };

        let mut draft = AlertDraft::new(&candle.coin, candle.date, alert_type, description);
        draft.rsi = Some(stats::round_dp(rsi, 2));
        draft.price = Some(candle.close);
        vec![draft]
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

/// Whole-dollar amount with thousands separators, e.g. `$6,000,000`
pub fn format_usd(value: f64) -> String {
    let rounded = value.abs().round() as u64;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && rounded > 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
