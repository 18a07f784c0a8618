//! Error type for the I/O and configuration edges of the crate.
//!
//! The indicator and detection engine itself never fails: short or empty
//! input produces `None`s and empty alert lists instead.

use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{coin}: history not strictly ascending at {date} (previous {previous})")]
    UnorderedHistory {
        coin: String,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("no candle history for {coin} at {path}")]
    MissingHistory { coin: String, path: PathBuf },

    #[error("{path} holds {found} candles, expected {expected}")]
    CoinMismatch {
        expected: String,
        found: String,
        path: PathBuf,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SentinelError>;
