//! Core types used throughout Volume Sentinel
//!
//! Defines daily candles, enriched indicator rows, futures snapshots and the
//! alert model shared by the detectors, the store and the CSV layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::features::stats::round_dp;

/// Raw daily kline as delivered by the exchange, before flow decomposition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kline {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Volume in base asset
    pub volume: f64,
    /// Taker buy volume in base asset
    pub taker_buy_volume: f64,
}

/// One coin, one UTC calendar day, already aggregated across trading pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Base coin symbol (BTC, ETH, ...)
    pub coin: String,
    /// Calendar day (UTC), unique per coin
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Volume in base currency
    pub total_volume: f64,
    /// Taker buy volume
    pub buy_volume: f64,
    /// Taker sell volume
    pub sell_volume: f64,
    /// buy_volume - sell_volume
    pub net_volume: f64,
    pub buy_volume_usd: f64,
    pub sell_volume_usd: f64,
    pub net_volume_usd: f64,
    /// Close vs open, whole-number percent
    pub price_change_pct: f64,
}

impl Candle {
    /// Build a candle from a raw kline, deriving the flow split and USD values.
    ///
    /// USD values use the average of open and close as the price proxy.
    pub fn from_kline(coin: impl Into<String>, date: NaiveDate, kline: &Kline) -> Self {
        let buy_volume = kline.taker_buy_volume;
        let sell_volume = kline.volume - buy_volume;
        let net_volume = buy_volume - sell_volume;

        let avg_price = (kline.open + kline.close) / 2.0;

        let price_change_pct = if kline.open > 0.0 {
            (kline.close - kline.open) / kline.open * 100.0
        } else {
            0.0
        };

        Self {
            coin: coin.into(),
            date,
            open: kline.open,
            high: kline.high,
            low: kline.low,
            close: kline.close,
            total_volume: kline.volume,
            buy_volume,
            sell_volume,
            net_volume,
            buy_volume_usd: buy_volume * avg_price,
            sell_volume_usd: sell_volume * avg_price,
            net_volume_usd: net_volume * avg_price,
            price_change_pct,
        }
    }
}

/// Price/volume divergence tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivergenceSignal {
    /// Price falling while net flow accumulates
    Bullish,
    /// Price rising while net flow distributes
    Bearish,
    /// Enough history, no divergence
    #[serde(rename = "none")]
    Neutral,
}

impl fmt::Display for DivergenceSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergenceSignal::Bullish => write!(f, "bullish"),
            DivergenceSignal::Bearish => write!(f, "bearish"),
            DivergenceSignal::Neutral => write!(f, "none"),
        }
    }
}

/// Candle plus derived indicator values.
///
/// `None` means there was not enough history at this index, never missing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCandle {
    #[serde(flatten)]
    pub candle: Candle,

    pub vwap: Option<f64>,

    // RSI (Wilder's smoothing)
    pub rsi: Option<f64>,

    // MACD
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,

    // Bollinger Bands
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,

    pub volume_zscore: Option<f64>,
    pub divergence_signal: Option<DivergenceSignal>,
    pub obv: Option<f64>,
}

impl From<Candle> for EnrichedCandle {
    fn from(candle: Candle) -> Self {
        Self {
            candle,
            vwap: None,
            rsi: None,
            macd: None,
            macd_signal: None,
            macd_histogram: None,
            bb_upper: None,
            bb_middle: None,
            bb_lower: None,
            volume_zscore: None,
            divergence_signal: None,
            obv: None,
        }
    }
}

/// Futures premium / funding / open interest at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesSnapshot {
    /// Base coin (BTC, ETH, ...)
    pub coin: String,
    /// Perpetual symbol (BTCUSDT)
    pub symbol: String,
    /// UTC day the snapshot was taken
    pub date: NaiveDate,
    pub spot_price: f64,
    /// Futures mark price
    pub futures_price: f64,
    /// (futures - spot) / spot, whole-number percent
    pub premium_pct: f64,
    /// Fraction paid per 8h funding interval
    pub funding_rate: f64,
    /// funding_rate x 3 x 365 x 100
    pub funding_rate_annualized: f64,
    pub open_interest: Option<f64>,
}

/// Funding intervals per day on 8h perpetuals
pub const FUNDING_PERIODS_PER_DAY: f64 = 3.0;

impl FuturesSnapshot {
    /// Build a snapshot from exchange quotes.
    ///
    /// When no spot price is supplied, the index price stands in for it.
    pub fn from_quotes(
        coin: impl Into<String>,
        date: NaiveDate,
        spot_price: Option<f64>,
        quote: &FuturesQuote,
    ) -> Self {
        let coin = coin.into();
        let spot_price = spot_price.unwrap_or(quote.index_price);
        let premium_pct = round_dp(futures_premium_pct(spot_price, quote.mark_price), 4);
        let funding_rate_annualized = round_dp(annualize_funding(quote.funding_rate), 2);

        Self {
            symbol: format!("{coin}USDT"),
            coin,
            date,
            spot_price,
            futures_price: quote.mark_price,
            premium_pct,
            funding_rate: quote.funding_rate,
            funding_rate_annualized,
            open_interest: quote.open_interest,
        }
    }
}

/// Premium index response for a perpetual
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuturesQuote {
    pub mark_price: f64,
    pub index_price: f64,
    pub funding_rate: f64,
    pub open_interest: Option<f64>,
}

/// Premium (positive) or discount (negative) of futures over spot, in percent
pub fn futures_premium_pct(spot_price: f64, futures_price: f64) -> f64 {
    if spot_price == 0.0 {
        return 0.0;
    }
    (futures_price - spot_price) / spot_price * 100.0
}

/// Annualized funding in whole-number percent
pub fn annualize_funding(funding_rate: f64) -> f64 {
    funding_rate * FUNDING_PERIODS_PER_DAY * 365.0 * 100.0
}

/// Whale size classification by USD value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    SmallWhale,
    MediumWhale,
    LargeWhale,
    MegaWhale,
}

impl SizeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::SmallWhale => "small_whale",
            SizeClass::MediumWhale => "medium_whale",
            SizeClass::LargeWhale => "large_whale",
            SizeClass::MegaWhale => "mega_whale",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Every alert the detectors can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    WhaleBuy,
    WhaleSell,
    WhaleAccumulation,
    WhaleDistribution,
    VolumeSpike,
    BuyVolumeSpike,
    SellVolumeSpike,
    BullishDivergence,
    BearishDivergence,
    RsiOversold,
    RsiOverbought,
    HighFuturesPremium,
    FuturesDiscount,
    ExtremeFundingRate,
    ExtremeNegativeFunding,
    BackwardationSignal,
    ContangoWarning,
}

impl AlertType {
    pub const ALL: [AlertType; 17] = [
        AlertType::WhaleBuy,
        AlertType::WhaleSell,
        AlertType::WhaleAccumulation,
        AlertType::WhaleDistribution,
        AlertType::VolumeSpike,
        AlertType::BuyVolumeSpike,
        AlertType::SellVolumeSpike,
        AlertType::BullishDivergence,
        AlertType::BearishDivergence,
        AlertType::RsiOversold,
        AlertType::RsiOverbought,
        AlertType::HighFuturesPremium,
        AlertType::FuturesDiscount,
        AlertType::ExtremeFundingRate,
        AlertType::ExtremeNegativeFunding,
        AlertType::BackwardationSignal,
        AlertType::ContangoWarning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::WhaleBuy => "whale_buy",
            AlertType::WhaleSell => "whale_sell",
            AlertType::WhaleAccumulation => "whale_accumulation",
            AlertType::WhaleDistribution => "whale_distribution",
            AlertType::VolumeSpike => "volume_spike",
            AlertType::BuyVolumeSpike => "buy_volume_spike",
            AlertType::SellVolumeSpike => "sell_volume_spike",
            AlertType::BullishDivergence => "bullish_divergence",
            AlertType::BearishDivergence => "bearish_divergence",
            AlertType::RsiOversold => "rsi_oversold",
            AlertType::RsiOverbought => "rsi_overbought",
            AlertType::HighFuturesPremium => "high_futures_premium",
            AlertType::FuturesDiscount => "futures_discount",
            AlertType::ExtremeFundingRate => "extreme_funding_rate",
            AlertType::ExtremeNegativeFunding => "extreme_negative_funding",
            AlertType::BackwardationSignal => "backwardation_signal",
            AlertType::ContangoWarning => "contango_warning",
        }
    }

    pub fn is_divergence(&self) -> bool {
        self.as_str().contains("divergence")
    }

    /// Futures alerts carry their own severity tiers
    pub fn is_futures(&self) -> bool {
        matches!(
            self,
            AlertType::HighFuturesPremium
                | AlertType::FuturesDiscount
                | AlertType::ExtremeFundingRate
                | AlertType::ExtremeNegativeFunding
                | AlertType::BackwardationSignal
                | AlertType::ContangoWarning
        )
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown alert type: {s}"))
    }
}

/// Known optional alert context, plus an open extension map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertMetadata {
    /// Historical average volume behind a spike
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_volume: Option<f64>,
    /// Net volume on the divergence day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_rate_annualized: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub futures_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AlertMetadata {
    pub fn is_empty(&self) -> bool {
        *self == AlertMetadata::default()
    }
}

/// Identity of an alert for idempotent upserts
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlertKey {
    pub coin: String,
    pub date: NaiveDate,
    pub alert_type: AlertType,
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.coin, self.date, self.alert_type)
    }
}

/// Alert as produced by a detector, before severity is assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDraft {
    pub coin: String,
    pub date: NaiveDate,
    pub alert_type: AlertType,
    pub value_usd: Option<f64>,
    pub volume: Option<f64>,
    pub price: Option<f64>,
    pub zscore: Option<f64>,
    pub size_class: Option<SizeClass>,
    pub rsi: Option<f64>,
    pub description: String,
    #[serde(default)]
    pub metadata: AlertMetadata,
}

impl AlertDraft {
    /// Draft with only identity and description filled in
    pub fn new(
        coin: impl Into<String>,
        date: NaiveDate,
        alert_type: AlertType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            coin: coin.into(),
            date,
            alert_type,
            value_usd: None,
            volume: None,
            price: None,
            zscore: None,
            size_class: None,
            rsi: None,
            description: description.into(),
            metadata: AlertMetadata::default(),
        }
    }

    pub fn key(&self) -> AlertKey {
        AlertKey {
            coin: self.coin.clone(),
            date: self.date,
            alert_type: self.alert_type,
        }
    }
}

/// Finalized alert with severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    #[serde(flatten)]
    pub draft: AlertDraft,
}

impl Alert {
    pub fn new(draft: AlertDraft, severity: Severity) -> Self {
        Self { severity, draft }
    }

    pub fn key(&self) -> AlertKey {
        self.draft.key()
    }

    pub fn alert_type(&self) -> AlertType {
        self.draft.alert_type
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {}: {}",
            self.severity.as_str().to_uppercase(),
            self.draft.coin,
            self.draft.date,
            self.draft.alert_type,
            self.draft.description
        )
    }
}
