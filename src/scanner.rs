//! Alert scanner - enrich once, slice, detect, classify
//!
//! Pipeline per coin:
//! 1. `IndicatorEngine::enrich` over the full ascending history
//! 2. for each scanned day, current = that day, historical = up to
//!    `history_days` preceding days
//! 3. `AnomalyDetector::detect_all` produces drafts
//! 4. `SeverityClassifier` finalizes them

use tracing::{debug, info};

use crate::config::AppConfig;
use crate::detection::{AnomalyDetector, FuturesAnomalyDetector, SeverityClassifier};
use crate::features::IndicatorEngine;
use crate::persistence::AlertSink;
use crate::types::{Alert, Candle, EnrichedCandle, FuturesSnapshot};

#[derive(Debug, Clone)]
pub struct AlertScanner {
    engine: IndicatorEngine,
    detector: AnomalyDetector,
    classifier: SeverityClassifier,
    futures: FuturesAnomalyDetector,
    history_days: usize,
    scan_days: usize,
}

impl AlertScanner {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            engine: IndicatorEngine::new(config.features.clone()),
            detector: AnomalyDetector::new(config.detection.clone()),
            classifier: SeverityClassifier::new(config.severity.clone()),
            futures: FuturesAnomalyDetector::new(config.futures.clone()),
            history_days: config.tracker.history_days,
            scan_days: config.tracker.scan_days,
        }
    }

    pub fn engine(&self) -> &IndicatorEngine {
        &self.engine
    }

    /// Finalized alerts for `enriched[index]` against its trailing window.
    ///
    /// Out-of-range indices yield nothing.
    pub fn scan_day(&self, enriched: &[EnrichedCandle], index: usize) -> Vec<Alert> {
        let Some(current) = enriched.get(index) else {
            return Vec::new();
        };
        let start = index.saturating_sub(self.history_days);
        let historical = &enriched[start..index];

        let drafts = self.detector.detect_all(current, historical);
        self.classifier.finalize_all(drafts)
    }

    /// Scan the last `scan_days` entries of an already enriched history
    pub fn scan_enriched(&self, enriched: &[EnrichedCandle]) -> Vec<Alert> {
        let start = enriched.len().saturating_sub(self.scan_days);
        let alerts: Vec<Alert> = (start..enriched.len())
            .flat_map(|i| self.scan_day(enriched, i))
            .collect();

        if let Some(last) = enriched.last() {
            debug!(
                coin = %last.candle.coin,
                scanned_days = enriched.len() - start,
                alerts = alerts.len(),
                "Scan finished"
            );
        }
        alerts
    }

    /// Enrich the full history and scan its most recent days, in date order
    pub fn scan_recent(&self, candles: &[Candle]) -> Vec<Alert> {
        let enriched = self.engine.enrich(candles);
        self.scan_enriched(&enriched)
    }

    /// Scan and upsert into `sink`; returns how many alerts were new
    pub fn scan_into<S: AlertSink + ?Sized>(&self, candles: &[Candle], sink: &S) -> usize {
        let alerts = self.scan_recent(candles);
        let total = alerts.len();
        let new = alerts.into_iter().filter(|a| sink.upsert(a.clone())).count();

        if let Some(first) = candles.first() {
            info!(coin = %first.coin, alerts = total, new_alerts = new, "Alerts stored");
        }
        new
    }

    pub fn scan_futures(&self, snapshot: &FuturesSnapshot) -> Vec<Alert> {
        self.futures.detect(snapshot)
    }
}

impl Default for AlertScanner {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}
