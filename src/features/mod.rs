//! Indicator Engine - Technical indicators over daily candle history
//!
//! Computes, for an ascending-by-date candle sequence:
//! - VWAP (cumulative from the start of the supplied sequence)
//! - RSI (Wilder's smoothing)
//! - MACD (EMA signal line over the compacted MACD series)
//! - Bollinger Bands (population std dev)
//! - Rolling volume Z-score
//! - Price / net-volume divergence tags
//! - OBV (On Balance Volume)
//!
//! Every routine is a pure function of its input. Short input is never an
//! error: indices without enough history come back as `None`.

use crate::config::FeaturesConfig;
use crate::types::{Candle, DivergenceSignal, EnrichedCandle};

pub mod flow;
pub mod stats;

pub use flow::{cumulative_net_flow, CumulativeFlow, FlowSummary};

/// MACD line, signal line and histogram, index-aligned with the input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Upper, middle and lower band, index-aligned with the input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Indicator engine holding the periods it computes with.
///
/// Holds no state between calls, so one engine can serve any number of coins.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    config: FeaturesConfig,
}

impl IndicatorEngine {
    pub fn new(config: FeaturesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeaturesConfig {
        &self.config
    }

    /// Enrich an ascending candle history with every indicator.
    ///
    /// Output has the same length and order as the input. VWAP is cumulative
    /// from `candles[0]`, so pass the full history rather than a slice.
    pub fn enrich(&self, candles: &[Candle]) -> Vec<EnrichedCandle> {
        if candles.is_empty() {
            tracing::debug!("IndicatorEngine::enrich: No candles provided");
            return Vec::new();
        }

        let cfg = &self.config;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.total_volume).collect();
        let net_volumes: Vec<f64> = candles.iter().map(|c| c.net_volume).collect();

        tracing::debug!(
            coin = %candles[0].coin,
            candle_count = candles.len(),
            first_date = %candles[0].date,
            last_date = %candles[candles.len() - 1].date,
            "IndicatorEngine::enrich starting"
        );

        let vwap = compute_vwap(candles);
        let rsi = compute_rsi(&closes, cfg.rsi_period);
        let macd = compute_macd(&closes, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal);
        let bb = compute_bollinger(&closes, cfg.bb_period, cfg.bb_std_dev);
        let volume_z = compute_volume_zscore(&volumes, cfg.volume_zscore_window);
        let divergence = compute_divergence(&closes, &net_volumes, cfg.divergence_lookback);
        let obv = compute_obv(&closes, &volumes);

        candles
            .iter()
            .enumerate()
            .map(|(i, candle)| EnrichedCandle {
                candle: candle.clone(),
                vwap: Some(vwap[i]),
                rsi: rsi[i],
                macd: macd.macd[i],
                macd_signal: macd.signal[i],
                macd_histogram: macd.histogram[i],
                bb_upper: bb.upper[i],
                bb_middle: bb.middle[i],
                bb_lower: bb.lower[i],
                volume_zscore: volume_z[i],
                divergence_signal: divergence[i],
                obv: Some(obv[i]),
            })
            .collect()
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(FeaturesConfig::default())
    }
}

/// VWAP cumulative from the first candle.
///
/// Falls back to the candle's close while cumulative volume is still zero.
pub fn compute_vwap(candles: &[Candle]) -> Vec<f64> {
    let mut cum_pv = 0.0;
    let mut cum_volume = 0.0;

    candles
        .iter()
        .map(|c| {
            let typical = (c.high + c.low + c.close) / 3.0;
            cum_pv += typical * c.total_volume;
            cum_volume += c.total_volume;
            if cum_volume > 0.0 {
                cum_pv / cum_volume
            } else {
                c.close
            }
        })
        .collect()
}

/// RSI with Wilder's smoothing.
///
/// The first `period` entries are `None`; fewer than `period + 1` closes
/// gives all `None`. A zero average loss reads as RSI 100.
pub fn compute_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        tracing::debug!(
            candle_count = closes.len(),
            required = period + 1,
            "RSI: Not enough candles"
        );
        return out;
    }

    let split = |change: f64| -> (f64, f64) {
        if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, change.abs())
        }
    };

    // Seed with the simple average of the first `period` changes
    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let (g, l) = split(closes[i] - closes[i - 1]);
        gains += g;
        losses += l;
    }
    let p = period as f64;
    let mut avg_gain = gains / p;
    let mut avg_loss = losses / p;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in (period + 1)..closes.len() {
        let (gain, loss) = split(closes[i] - closes[i - 1]);
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// EMA seeded with the SMA of the first `period` values.
///
/// `None` before index `period - 1`, and everywhere when the input is
/// shorter than `period`.
pub fn compute_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);

    for i in period..values.len() {
        ema = (values[i] - ema) * multiplier + ema;
        out[i] = Some(ema);
    }

    out
}

/// MACD with EMA signal line.
///
/// The signal line is an EMA over the non-null MACD values only, then
/// left-padded with `None` back to the input length. With fewer than
/// `signal` MACD values the signal line is all `None`.
pub fn compute_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let n = closes.len();
    let fast_ema = compute_ema(closes, fast);
    let slow_ema = compute_ema(closes, slow);

    let macd: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let compacted: Vec<f64> = macd.iter().flatten().copied().collect();
    let signal_line = if signal > 0 && compacted.len() >= signal {
        let signal_ema = compute_ema(&compacted, signal);
        let mut padded = vec![None; n - signal_ema.len()];
        padded.extend(signal_ema);
        padded
    } else {
        vec![None; n]
    };

    let histogram = macd
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        })
        .collect();

    MacdSeries {
        macd,
        signal: signal_line,
        histogram,
    }
}

/// Bollinger Bands: SMA of the trailing `period` closes ± `std_dev` population
/// standard deviations. `None` for the first `period - 1` indices.
pub fn compute_bollinger(closes: &[f64], period: usize, std_dev: f64) -> BollingerSeries {
    let n = closes.len();
    let mut bands = BollingerSeries {
        upper: vec![None; n],
        middle: vec![None; n],
        lower: vec![None; n],
    };
    if period == 0 || n < period {
        return bands;
    }

    for i in (period - 1)..n {
        let window = &closes[i + 1 - period..=i];
        let sma = stats::mean(window);
        let std = stats::std_pop(window);

        bands.middle[i] = Some(sma);
        bands.upper[i] = Some(sma + std_dev * std);
        bands.lower[i] = Some(sma - std_dev * std);
    }

    bands
}

/// Rolling Z-score of each volume against its own trailing window
/// (current value included). 0 when the window is flat.
pub fn compute_volume_zscore(volumes: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = volumes.len();
    let mut out = vec![None; n];
    if window == 0 || n < window {
        return out;
    }

    for i in (window - 1)..n {
        let slice = &volumes[i + 1 - window..=i];
        out[i] = Some(stats::zscore(volumes[i], slice));
    }

    out
}

/// Divergence between price trend and net-volume trend.
///
/// From index `lookback` on, price trend is `close[i] - close[i - lookback]`
/// and volume trend is the sum of net volume over the same `lookback + 1`
/// days. Earlier indices are `None`.
pub fn compute_divergence(
    closes: &[f64],
    net_volumes: &[f64],
    lookback: usize,
) -> Vec<Option<DivergenceSignal>> {
    let n = closes.len().min(net_volumes.len());
    let mut out = vec![None; closes.len()];
    if n < lookback + 1 {
        return out;
    }

    for i in lookback..n {
        let price_trend = closes[i] - closes[i - lookback];
        let volume_trend: f64 = net_volumes[i - lookback..=i].iter().sum();
        out[i] = Some(classify_divergence(price_trend, volume_trend));
    }

    out
}

/// Bullish when price falls on net accumulation, bearish when it rises on
/// net distribution
pub fn classify_divergence(price_trend: f64, volume_trend: f64) -> DivergenceSignal {
    if price_trend < 0.0 && volume_trend > 0.0 {
        DivergenceSignal::Bullish
    } else if price_trend > 0.0 && volume_trend < 0.0 {
        DivergenceSignal::Bearish
    } else {
        DivergenceSignal::Neutral
    }
}

/// On Balance Volume, starting from the first day's volume
pub fn compute_obv(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let n = closes.len().min(volumes.len());
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }

    let mut obv = volumes[0];
    out.push(obv);
    for i in 1..n {
        if closes[i] > closes[i - 1] {
            obv += volumes[i];
        } else if closes[i] < closes[i - 1] {
            obv -= volumes[i];
        }
        out.push(obv);
    }

    out
}
