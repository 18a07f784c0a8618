//! Persistence Module
//!
//! Seams between the engine and storage: where candle histories come from
//! ([`CandleSource`]) and where finalized alerts go ([`AlertSink`]). Ships a
//! CSV-backed candle source and an in-memory alert store.

mod alert_store;
mod csv_store;

pub use alert_store::{AlertFilter, AlertStore, AlertSummary, StoredAlert, DEFAULT_QUERY_LIMIT};
pub use csv_store::{
    load_candles, read_alerts, write_alerts, write_candles, write_enriched, AlertRecord,
    CsvCandleSource, EnrichedRecord,
};

use crate::error::Result;
use crate::types::{Alert, Candle};

/// Source of ascending, deduplicated daily candle histories
pub trait CandleSource: Send + Sync {
    fn load(&self, coin: &str) -> Result<Vec<Candle>>;
}

/// Destination for finalized alerts.
///
/// Implementations must treat (coin, date, alert_type) as the identity and
/// overwrite on repeat. Returns `true` when the alert was new.
#[cfg_attr(test, mockall::automock)]
pub trait AlertSink: Send + Sync {
    fn upsert(&self, alert: Alert) -> bool;
}
