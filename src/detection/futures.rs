//! Futures market anomalies - premium/discount, extreme funding, basis signals
//!
//! Works on a single [`FuturesSnapshot`] with no history. Unlike the spot
//! detectors, each rule carries its own severity tier, so alerts leave here
//! already finalized.

use serde::{Deserialize, Serialize};

use crate::config::FuturesConfig;
use crate::features::stats::round_dp;
use crate::types::{Alert, AlertDraft, AlertType, FuturesSnapshot, Severity};

#[derive(Debug, Clone, Default)]
pub struct FuturesAnomalyDetector {
    config: FuturesConfig,
}

impl FuturesAnomalyDetector {
    pub fn new(config: FuturesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FuturesConfig {
        &self.config
    }

    /// Run the premium, funding and basis checks.
    ///
    /// Within each pair only one direction can fire; the three pairs are
    /// independent of each other.
    pub fn detect(&self, snapshot: &FuturesSnapshot) -> Vec<Alert> {
        let cfg = &self.config;
        let premium = snapshot.premium_pct;
        let funding = snapshot.funding_rate;
        let annualized = snapshot.funding_rate_annualized;
        let mut alerts = Vec::new();

        if premium > cfg.premium {
            let severity = if premium > cfg.premium_severe {
                Severity::High
            } else {
                Severity::Medium
            };
            alerts.push(self.alert(
                snapshot,
                AlertType::HighFuturesPremium,
                severity,
                format!("High futures premium: {premium:.2}% - Market overheating"),
            ));
        } else if premium < -cfg.premium {
            let severity = if premium < -cfg.premium_severe {
                Severity::High
            } else {
                Severity::Medium
            };
            alerts.push(self.alert(
                snapshot,
                AlertType::FuturesDiscount,
                severity,
                format!("Futures trading at discount: {premium:.2}% - Market fear"),
            ));
        }

        if annualized > cfg.funding_annualized {
            let severity = if annualized > cfg.funding_annualized_severe {
                Severity::Critical
            } else {
                Severity::High
            };
            alerts.push(self.alert(
                snapshot,
                AlertType::ExtremeFundingRate,
                severity,
                format!("Extreme positive funding: {annualized:.1}% annualized - Longs paying shorts heavily"),
            ));
        } else if annualized < -cfg.funding_annualized {
            let severity = if annualized < -cfg.funding_annualized_severe {
                Severity::Critical
            } else {
                Severity::High
            };
            alerts.push(self.alert(
                snapshot,
                AlertType::ExtremeNegativeFunding,
                severity,
                format!("Extreme negative funding: {annualized:.1}% annualized - Shorts paying longs heavily"),
            ));
        }

        if premium < -cfg.basis_premium && funding < -cfg.basis_funding {
            alerts.push(self.alert(
                snapshot,
                AlertType::BackwardationSignal,
                Severity::Medium,
                "Backwardation + negative funding - Potential bullish setup".to_string(),
            ));
        } else if premium > cfg.basis_premium && funding > cfg.basis_funding {
            alerts.push(self.alert(
                snapshot,
                AlertType::ContangoWarning,
                Severity::Medium,
                "High contango + positive funding - Potential bearish setup".to_string(),
            ));
        }

        tracing::debug!(
            coin = %snapshot.coin,
            premium_pct = premium,
            funding_annualized = annualized,
            alerts = alerts.len(),
            "FuturesAnomalyDetector::detect finished"
        );

        alerts
    }

    /// Liquidation zones for the snapshot's mark price at the configured leverage
    pub fn liquidation_estimate(&self, snapshot: &FuturesSnapshot) -> LiquidationEstimate {
        LiquidationEstimate::from_mark(
            &snapshot.symbol,
            snapshot.futures_price,
            self.config.assumed_leverage,
        )
    }

    fn alert(
        &self,
        snapshot: &FuturesSnapshot,
        alert_type: AlertType,
        severity: Severity,
        description: String,
    ) -> Alert {
        let mut draft = AlertDraft::new(&snapshot.coin, snapshot.date, alert_type, description);
        draft.price = Some(snapshot.futures_price);

        let meta = &mut draft.metadata;
        meta.premium_pct = Some(snapshot.premium_pct);
        meta.funding_rate = Some(snapshot.funding_rate);
        meta.funding_rate_annualized = Some(snapshot.funding_rate_annualized);
        meta.spot_price = Some(snapshot.spot_price);
        meta.futures_price = Some(snapshot.futures_price);
        meta.open_interest = snapshot.open_interest;

        Alert::new(draft, severity)
    }
}

/// Rough liquidation zones assuming every position runs the same leverage.
///
/// An estimate only, not observed liquidations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationEstimate {
    pub symbol: String,
    pub current_price: f64,
    /// Longs get liquidated below this
    pub long_liquidation_zone: f64,
    /// Shorts get liquidated above this
    pub short_liquidation_zone: f64,
    pub leverage: f64,
}

impl LiquidationEstimate {
    pub fn from_mark(symbol: impl Into<String>, mark_price: f64, leverage: f64) -> Self {
        let threshold = if leverage > 0.0 { 1.0 / leverage } else { 0.0 };
        Self {
            symbol: symbol.into(),
            current_price: mark_price,
            long_liquidation_zone: round_dp(mark_price * (1.0 - threshold), 2),
            short_liquidation_zone: round_dp(mark_price * (1.0 + threshold), 2),
            leverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot(premium_pct: f64, funding_rate: f64, funding_rate_annualized: f64) -> FuturesSnapshot {
        FuturesSnapshot {
            coin: "BTC".to_string(),
            symbol: "BTCUSDT".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            spot_price: 60_000.0,
            futures_price: 60_000.0 * (1.0 + premium_pct / 100.0),
            premium_pct,
            funding_rate,
            funding_rate_annualized,
            open_interest: Some(80_000.0),
        }
    }

    fn types(alerts: &[Alert]) -> Vec<AlertType> {
        alerts.iter().map(Alert::alert_type).collect()
    }

    #[test]
    fn test_quiet_market_no_alerts() {
        let d = FuturesAnomalyDetector::default();
        // 0.002% per interval, 2.19% annualized
        assert!(d.detect(&snapshot(0.2, 0.00002, 2.19)).is_empty());
    }

    #[test]
    fn test_overheated_market_upper_tiers() {
        let d = FuturesAnomalyDetector::default();
        let alerts = d.detect(&snapshot(1.2, 0.001, 120.0));

        assert_eq!(
            types(&alerts),
            vec![AlertType::HighFuturesPremium, AlertType::ExtremeFundingRate]
        );
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[1].severity, Severity::Critical);
        assert_eq!(alerts[0].draft.metadata.spot_price, Some(60_000.0));
        assert_eq!(alerts[1].draft.metadata.funding_rate_annualized, Some(120.0));
    }

    #[test]
    fn test_lower_tiers() {
        let d = FuturesAnomalyDetector::default();
        let alerts = d.detect(&snapshot(0.7, 0.0005, 60.0));
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert_eq!(alerts[1].severity, Severity::High);
    }

    #[test]
    fn test_funding_and_contango_cofire() {
        let d = FuturesAnomalyDetector::default();
        let alerts = d.detect(&snapshot(0.4, 0.02, 2190.0));
        assert_eq!(
            types(&alerts),
            vec![AlertType::ExtremeFundingRate, AlertType::ContangoWarning]
        );
    }

    #[test]
    fn test_fearful_market() {
        let d = FuturesAnomalyDetector::default();
        let alerts = d.detect(&snapshot(-1.5, -0.02, -2190.0));
        assert_eq!(
            types(&alerts),
            vec![
                AlertType::FuturesDiscount,
                AlertType::ExtremeNegativeFunding,
                AlertType::BackwardationSignal
            ]
        );
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[1].severity, Severity::Critical);
        assert_eq!(alerts[2].severity, Severity::Medium);
    }

    #[test]
    fn test_liquidation_zones() {
        let est = LiquidationEstimate::from_mark("BTCUSDT", 50_000.0, 10.0);
        assert_eq!(est.long_liquidation_zone, 45_000.0);
        assert_eq!(est.short_liquidation_zone, 55_000.0);

        let d = FuturesAnomalyDetector::default();
        let est = d.liquidation_estimate(&snapshot(0.0, 0.0, 0.0));
        assert_eq!(est.symbol, "BTCUSDT");
        assert_eq!(est.long_liquidation_zone, 54_000.0);
    }
}
