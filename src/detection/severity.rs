//! Severity cascade for spot alert drafts

use crate::config::SeverityConfig;
use crate::types::{Alert, AlertDraft, Severity, SizeClass};

/// Maps a draft to a severity. The first matching rule wins:
///
/// 1. mega whale: critical
/// 2. large whale: high
/// 3. |z| above `critical_zscore`: critical
/// 4. |z| above `high_zscore`: high
/// 5. any divergence: medium
/// 6. medium whale: medium
/// 7. |z| above `medium_zscore`: medium
/// 8. otherwise low
///
/// Futures types skip the cascade. Their tiers depend on premium and funding
/// thresholds, so a bare futures draft gets the lowest futures tier (medium);
/// [`FuturesAnomalyDetector`](super::FuturesAnomalyDetector) assigns the real one.
#[derive(Debug, Clone, Default)]
pub struct SeverityClassifier {
    config: SeverityConfig,
}

impl SeverityClassifier {
    pub fn new(config: SeverityConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, draft: &AlertDraft) -> Severity {
        if draft.alert_type.is_futures() {
            return Severity::Medium;
        }
        let z = draft.zscore.map(f64::abs).unwrap_or(0.0);

        match draft.size_class {
            Some(SizeClass::MegaWhale) => return Severity::Critical,
            Some(SizeClass::LargeWhale) => return Severity::High,
            _ => {}
        }

        if z > self.config.critical_zscore {
            Severity::Critical
        } else if z > self.config.high_zscore {
            Severity::High
        } else if draft.alert_type.is_divergence() {
            Severity::Medium
        } else if draft.size_class == Some(SizeClass::MediumWhale) {
            Severity::Medium
        } else if z > self.config.medium_zscore {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn finalize(&self, draft: AlertDraft) -> Alert {
        let severity = self.classify(&draft);
        Alert::new(draft, severity)
    }

    /// Finalize a batch, keeping draft order
    pub fn finalize_all(&self, drafts: Vec<AlertDraft>) -> Vec<Alert> {
        drafts.into_iter().map(|d| self.finalize(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertType;
    use chrono::NaiveDate;

    fn draft(alert_type: AlertType) -> AlertDraft {
        AlertDraft::new(
            "BTC",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            alert_type,
            "test",
        )
    }

    #[test]
    fn test_whale_sizes() {
        let c = SeverityClassifier::default();
        let mut d = draft(AlertType::WhaleBuy);

        d.size_class = Some(SizeClass::MegaWhale);
        assert_eq!(c.classify(&d), Severity::Critical);
        d.size_class = Some(SizeClass::LargeWhale);
        assert_eq!(c.classify(&d), Severity::High);
        d.size_class = Some(SizeClass::MediumWhale);
        assert_eq!(c.classify(&d), Severity::Medium);
        d.size_class = Some(SizeClass::SmallWhale);
        assert_eq!(c.classify(&d), Severity::Low);
    }

    #[test]
    fn test_zscore_tiers_are_strict() {
        let c = SeverityClassifier::default();
        let mut d = draft(AlertType::VolumeSpike);

        d.zscore = Some(3.51);
        assert_eq!(c.classify(&d), Severity::Critical);
        d.zscore = Some(3.5);
        assert_eq!(c.classify(&d), Severity::High);
        d.zscore = Some(-3.2);
        assert_eq!(c.classify(&d), Severity::High);
        d.zscore = Some(3.0);
        assert_eq!(c.classify(&d), Severity::Medium);
        d.zscore = Some(2.5);
        assert_eq!(c.classify(&d), Severity::Low);
    }

    #[test]
    fn test_divergence_is_medium() {
        let c = SeverityClassifier::default();
        assert_eq!(c.classify(&draft(AlertType::BearishDivergence)), Severity::Medium);
        assert_eq!(c.classify(&draft(AlertType::RsiOversold)), Severity::Low);
    }

    #[test]
    fn test_size_beats_zscore() {
        let c = SeverityClassifier::default();
        let mut d = draft(AlertType::WhaleBuy);
        d.size_class = Some(SizeClass::LargeWhale);
        d.zscore = Some(5.0);
        assert_eq!(c.classify(&d), Severity::High);
    }

    #[test]
    fn test_futures_drafts_skip_cascade() {
        let c = SeverityClassifier::default();
        let mut d = draft(AlertType::ExtremeFundingRate);
        d.size_class = Some(SizeClass::MegaWhale);
        d.zscore = Some(5.0);
        assert_eq!(c.classify(&d), Severity::Medium);
        assert_eq!(c.finalize(draft(AlertType::ContangoWarning)).severity, Severity::Medium);
    }

    #[test]
    fn test_finalize_keeps_draft() {
        let c = SeverityClassifier::default();
        let mut d = draft(AlertType::VolumeSpike);
        d.zscore = Some(4.0);
        let alert = c.finalize(d.clone());
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.draft, d);
    }
}
