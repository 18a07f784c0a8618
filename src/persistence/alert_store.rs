//! In-memory alert store keyed by (coin, date, alert_type)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use super::AlertSink;
use crate::types::{Alert, AlertKey, AlertType, Severity};

/// Default page size for [`AlertStore::query`]
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// A finalized alert plus its bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlert {
    #[serde(flatten)]
    pub alert: Alert,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query filter; unset fields match everything
#[derive(Debug, Clone, PartialEq)]
pub struct AlertFilter {
    pub coin: Option<String>,
    /// Inclusive lower date bound
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper date bound
    pub end_date: Option<NaiveDate>,
    pub severity: Option<Severity>,
    pub alert_type: Option<AlertType>,
    pub limit: usize,
}

impl Default for AlertFilter {
    fn default() -> Self {
        Self {
            coin: None,
            start_date: None,
            end_date: None,
            severity: None,
            alert_type: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl AlertFilter {
    pub fn for_coin(coin: impl Into<String>) -> Self {
        Self {
            coin: Some(coin.into()),
            ..Default::default()
        }
    }

    fn matches(&self, alert: &Alert) -> bool {
        let draft = &alert.draft;
        self.coin.as_deref().map_or(true, |c| draft.coin == c)
            && self.start_date.map_or(true, |d| draft.date >= d)
            && self.end_date.map_or(true, |d| draft.date <= d)
            && self.severity.map_or(true, |s| alert.severity == s)
            && self.alert_type.map_or(true, |t| draft.alert_type == t)
    }
}

/// Counts per severity plus distinct types and coins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total_alerts: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unique_types: usize,
    pub coins_affected: usize,
}

/// Alert store with idempotent upserts.
///
/// Re-detecting the same (coin, date, alert_type) overwrites the record in
/// place and keeps its acknowledgement.
#[derive(Debug, Default)]
pub struct AlertStore {
    alerts: RwLock<BTreeMap<AlertKey, StoredAlert>>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns `true` when the key was new.
    pub fn upsert(&self, alert: Alert) -> bool {
        let now = Utc::now();
        let key = alert.key();
        let mut alerts = self.alerts.write().unwrap_or_else(PoisonError::into_inner);

        match alerts.get_mut(&key) {
            Some(existing) => {
                existing.alert = alert;
                existing.updated_at = now;
                false
            }
            None => {
                alerts.insert(
                    key,
                    StoredAlert {
                        alert,
                        acknowledged: false,
                        created_at: now,
                        updated_at: now,
                    },
                );
                true
            }
        }
    }

    /// Mark an alert as acknowledged. Unknown keys return `false`.
    pub fn acknowledge(&self, key: &AlertKey) -> bool {
        let mut alerts = self.alerts.write().unwrap_or_else(PoisonError::into_inner);
        match alerts.get_mut(key) {
            Some(stored) => {
                stored.acknowledged = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &AlertKey) -> Option<StoredAlert> {
        self.alerts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Matching alerts, newest date first, at most `filter.limit`
    pub fn query(&self, filter: &AlertFilter) -> Vec<StoredAlert> {
        let alerts = self.alerts.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched: Vec<StoredAlert> = alerts
            .values()
            .filter(|s| filter.matches(&s.alert))
            .cloned()
            .collect();
        // stable: same-day alerts stay in key order
        matched.sort_by(|a, b| b.alert.draft.date.cmp(&a.alert.draft.date));
        matched.truncate(filter.limit);
        matched
    }

    /// Summary of alerts dated on or after `since`, optionally for one coin
    pub fn summary(&self, coin: Option<&str>, since: Option<NaiveDate>) -> AlertSummary {
        let alerts = self.alerts.read().unwrap_or_else(PoisonError::into_inner);
        let mut summary = AlertSummary::default();
        let mut types = BTreeSet::new();
        let mut coins = BTreeSet::new();

        for stored in alerts.values() {
            let draft = &stored.alert.draft;
            if coin.map_or(false, |c| draft.coin != c) || since.map_or(false, |d| draft.date < d) {
                continue;
            }
            summary.total_alerts += 1;
            match stored.alert.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
            types.insert(draft.alert_type);
            coins.insert(draft.coin.clone());
        }

        summary.unique_types = types.len();
        summary.coins_affected = coins.len();
        summary
    }

    /// Drop alerts dated before `date`; returns how many were removed
    pub fn prune_before(&self, date: NaiveDate) -> usize {
        let mut alerts = self.alerts.write().unwrap_or_else(PoisonError::into_inner);
        let before = alerts.len();
        alerts.retain(|key, _| key.date >= date);
        before - alerts.len()
    }

    /// Every alert in key order (coin, date, type)
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|s| s.alert.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for AlertStore {
    fn upsert(&self, alert: Alert) -> bool {
        AlertStore::upsert(self, alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertDraft;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn alert(coin: &str, d: u32, alert_type: AlertType, severity: Severity) -> Alert {
        Alert::new(AlertDraft::new(coin, day(d), alert_type, "test"), severity)
    }

    #[test]
    fn test_upsert_is_idempotent_and_keeps_ack() {
        let store = AlertStore::new();
        assert!(store.upsert(alert("BTC", 1, AlertType::WhaleBuy, Severity::High)));
        let key = alert("BTC", 1, AlertType::WhaleBuy, Severity::High).key();
        assert!(store.acknowledge(&key));

        let mut updated = alert("BTC", 1, AlertType::WhaleBuy, Severity::Critical);
        updated.draft.description = "bigger".to_string();
        assert!(!store.upsert(updated));

        assert_eq!(store.len(), 1);
        let stored = store.get(&key).unwrap();
        assert_eq!(stored.alert.severity, Severity::Critical);
        assert_eq!(stored.alert.draft.description, "bigger");
        assert!(stored.acknowledged);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[test]
    fn test_acknowledge_unknown_key() {
        let store = AlertStore::new();
        let key = alert("ETH", 1, AlertType::RsiOversold, Severity::Low).key();
        assert!(!store.acknowledge(&key));
    }

    #[test]
    fn test_query_filters_and_orders() {
        let store = AlertStore::new();
        store.upsert(alert("BTC", 1, AlertType::WhaleBuy, Severity::High));
        store.upsert(alert("BTC", 3, AlertType::VolumeSpike, Severity::Medium));
        store.upsert(alert("BTC", 3, AlertType::WhaleBuy, Severity::Critical));
        store.upsert(alert("ETH", 2, AlertType::WhaleSell, Severity::High));

        let btc = store.query(&AlertFilter::for_coin("BTC"));
        let dates: Vec<NaiveDate> = btc.iter().map(|s| s.alert.draft.date).collect();
        assert_eq!(dates, vec![day(3), day(3), day(1)]);
        assert_eq!(btc[0].alert.alert_type(), AlertType::WhaleBuy);

        let high = store.query(&AlertFilter {
            severity: Some(Severity::High),
            ..Default::default()
        });
        assert_eq!(high.len(), 2);

        let ranged = store.query(&AlertFilter {
            start_date: Some(day(2)),
            end_date: Some(day(2)),
            ..Default::default()
        });
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].alert.draft.coin, "ETH");

        let limited = store.query(&AlertFilter {
            limit: 1,
            ..Default::default()
        });
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].alert.draft.date, day(3));
    }

    #[test]
    fn test_summary_and_prune() {
        let store = AlertStore::new();
        store.upsert(alert("BTC", 1, AlertType::WhaleBuy, Severity::Critical));
        store.upsert(alert("BTC", 5, AlertType::VolumeSpike, Severity::Medium));
        store.upsert(alert("ETH", 6, AlertType::VolumeSpike, Severity::Low));

        let all = store.summary(None, None);
        assert_eq!(all.total_alerts, 3);
        assert_eq!(all.critical, 1);
        assert_eq!(all.unique_types, 2);
        assert_eq!(all.coins_affected, 2);

        let recent_btc = store.summary(Some("BTC"), Some(day(2)));
        assert_eq!(recent_btc.total_alerts, 1);
        assert_eq!(recent_btc.medium, 1);

        assert_eq!(store.prune_before(day(5)), 1);
        assert_eq!(store.len(), 2);
    }
}
