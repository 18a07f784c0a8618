//! Net flow aggregation over a single coin's daily history

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Candle;

/// Totals and daily averages of buy/sell flow for one coin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub coin: String,
    pub total_days: usize,
    pub total_buy_volume: f64,
    pub total_sell_volume: f64,
    pub total_net_volume: f64,
    pub total_buy_usd: f64,
    pub total_sell_usd: f64,
    pub total_net_usd: f64,
    pub avg_price: f64,
    pub avg_daily_net_volume: f64,
    pub avg_daily_net_usd: f64,
}

impl FlowSummary {
    /// Summarize the most recent `days` candles, or all of them with `None`.
    ///
    /// Expects an ascending history. Returns `None` for an empty input.
    pub fn from_candles(candles: &[Candle], days: Option<usize>) -> Option<Self> {
        let start = match days {
            Some(d) => candles.len().saturating_sub(d),
            None => 0,
        };
        let window = &candles[start..];
        let first = window.first()?;

        let mut summary = FlowSummary {
            coin: first.coin.clone(),
            total_days: window.len(),
            ..Default::default()
        };

        let mut close_sum = 0.0;
        for c in window {
            summary.total_buy_volume += c.buy_volume;
            summary.total_sell_volume += c.sell_volume;
            summary.total_net_volume += c.net_volume;
            summary.total_buy_usd += c.buy_volume_usd;
            summary.total_sell_usd += c.sell_volume_usd;
            summary.total_net_usd += c.net_volume_usd;
            close_sum += c.close;
        }

        let n = window.len() as f64;
        summary.avg_price = close_sum / n;
        summary.avg_daily_net_volume = summary.total_net_volume / n;
        summary.avg_daily_net_usd = summary.total_net_usd / n;

        Some(summary)
    }

    /// Buy share of two-sided flow in [0, 1], 0.5 when there was no flow
    pub fn buy_ratio(&self) -> f64 {
        let total = self.total_buy_volume + self.total_sell_volume;
        if total > 0.0 {
            self.total_buy_volume / total
        } else {
            0.5
        }
    }
}

/// Running net flow at one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeFlow {
    pub date: NaiveDate,
    pub net_volume: f64,
    pub net_volume_usd: f64,
    pub cumulative_volume: f64,
    pub cumulative_usd: f64,
}

/// Running sum of net volume (base and USD) in date order
pub fn cumulative_net_flow(candles: &[Candle]) -> Vec<CumulativeFlow> {
    let mut volume = 0.0;
    let mut usd = 0.0;
    candles
        .iter()
        .map(|c| {
            volume += c.net_volume;
            usd += c.net_volume_usd;
            CumulativeFlow {
                date: c.date,
                net_volume: c.net_volume,
                net_volume_usd: c.net_volume_usd,
                cumulative_volume: volume,
                cumulative_usd: usd,
            }
        })
        .collect()
}
