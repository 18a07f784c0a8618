//! Volume Sentinel Library
//!
//! Indicator and anomaly detection engine for daily crypto candles: whale
//! flow, volume spikes, price/flow divergence, RSI extremes and futures stress

pub mod config;
pub mod detection;
pub mod error;
pub mod features;
pub mod persistence;
pub mod runner;
pub mod scanner;
pub mod types;

pub use error::{Result, SentinelError};
