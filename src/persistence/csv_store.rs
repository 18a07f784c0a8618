//! CSV persistence for candle histories, enriched series and alerts

use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::CandleSource;
use crate::error::{Result, SentinelError};
use crate::types::{
    Alert, AlertDraft, AlertMetadata, AlertType, Candle, DivergenceSignal, EnrichedCandle,
    Severity, SizeClass,
};

/// Flat enriched row. The csv writer cannot serialize flattened structs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub coin: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub total_volume: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub net_volume: f64,
    pub buy_volume_usd: f64,
    pub sell_volume_usd: f64,
    pub net_volume_usd: f64,
    pub price_change_pct: f64,
    pub vwap: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub volume_zscore: Option<f64>,
    pub divergence_signal: Option<DivergenceSignal>,
    pub obv: Option<f64>,
}

impl From<&EnrichedCandle> for EnrichedRecord {
    fn from(e: &EnrichedCandle) -> Self {
        let c = &e.candle;
        Self {
            coin: c.coin.clone(),
            date: c.date,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            total_volume: c.total_volume,
            buy_volume: c.buy_volume,
            sell_volume: c.sell_volume,
            net_volume: c.net_volume,
            buy_volume_usd: c.buy_volume_usd,
            sell_volume_usd: c.sell_volume_usd,
            net_volume_usd: c.net_volume_usd,
            price_change_pct: c.price_change_pct,
            vwap: e.vwap,
            rsi: e.rsi,
            macd: e.macd,
            macd_signal: e.macd_signal,
            macd_histogram: e.macd_histogram,
            bb_upper: e.bb_upper,
            bb_middle: e.bb_middle,
            bb_lower: e.bb_lower,
            volume_zscore: e.volume_zscore,
            divergence_signal: e.divergence_signal,
            obv: e.obv,
        }
    }
}

/// Flat alert row with metadata as a JSON column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub coin: String,
    pub date: NaiveDate,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    pub value_usd: Option<f64>,
    pub volume: Option<f64>,
    pub price: Option<f64>,
    pub zscore: Option<f64>,
    pub size_class: Option<SizeClass>,
    pub rsi: Option<f64>,
    pub metadata: String,
}

impl AlertRecord {
    pub fn from_alert(alert: &Alert) -> Result<Self> {
        let d = &alert.draft;
        let metadata = if d.metadata.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&d.metadata)?
        };
        Ok(Self {
            coin: d.coin.clone(),
            date: d.date,
            alert_type: d.alert_type,
            severity: alert.severity,
            description: d.description.clone(),
            value_usd: d.value_usd,
            volume: d.volume,
            price: d.price,
            zscore: d.zscore,
            size_class: d.size_class,
            rsi: d.rsi,
            metadata,
        })
    }

    pub fn into_alert(self) -> Result<Alert> {
        let metadata = if self.metadata.trim().is_empty() {
            AlertMetadata::default()
        } else {
            serde_json::from_str(&self.metadata)?
        };
        let draft = AlertDraft {
            coin: self.coin,
            date: self.date,
            alert_type: self.alert_type,
            value_usd: self.value_usd,
            volume: self.volume,
            price: self.price,
            zscore: self.zscore,
            size_class: self.size_class,
            rsi: self.rsi,
            description: self.description,
            metadata,
        };
        Ok(Alert::new(draft, self.severity))
    }
}

/// Load one coin's daily history.
///
/// Dates must be strictly ascending; a repeated or earlier date is rejected
/// before it can reach the indicator engine.
pub fn load_candles(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut candles: Vec<Candle> = Vec::new();
    for result in reader.deserialize() {
        let candle: Candle = result?;
        if let Some(previous) = candles.last() {
            if candle.date <= previous.date {
                return Err(SentinelError::UnorderedHistory {
                    coin: candle.coin,
                    date: candle.date,
                    previous: previous.date,
                });
            }
        }
        candles.push(candle);
    }

    tracing::debug!(path = %path.display(), candles = candles.len(), "Loaded candle history");
    Ok(candles)
}

/// Write a candle history, e.g. to seed a data directory
pub fn write_candles(path: impl AsRef<Path>, candles: &[Candle]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for candle in candles {
        writer.serialize(candle)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_enriched(path: impl AsRef<Path>, enriched: &[EnrichedCandle]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for row in enriched {
        writer.serialize(EnrichedRecord::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_alerts(path: impl AsRef<Path>, alerts: &[Alert]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for alert in alerts {
        writer.serialize(AlertRecord::from_alert(alert)?)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_alerts(path: impl AsRef<Path>) -> Result<Vec<Alert>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut alerts = Vec::new();
    for result in reader.deserialize() {
        let record: AlertRecord = result?;
        alerts.push(record.into_alert()?);
    }
    Ok(alerts)
}

/// Reads `<data_dir>/<COIN>.csv`
#[derive(Debug, Clone)]
pub struct CsvCandleSource {
    data_dir: PathBuf,
}

impl CsvCandleSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, coin: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", coin.to_uppercase()))
    }

    /// Output path for a coin's enriched series
    pub fn enriched_path_for(&self, coin: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}_enriched.csv", coin.to_uppercase()))
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

impl CandleSource for CsvCandleSource {
    fn load(&self, coin: &str) -> Result<Vec<Candle>> {
        let path = self.path_for(coin);
        if !path.exists() {
            return Err(SentinelError::MissingHistory {
                coin: coin.to_string(),
                path,
            });
        }

        let candles = load_candles(&path)?;
        let expected = coin.trim().to_uppercase();
        if let Some(stray) = candles
            .iter()
            .find(|c| c.coin.trim().to_uppercase() != expected)
        {
            return Err(SentinelError::CoinMismatch {
                expected,
                found: stray.coin.clone(),
                path,
            });
        }
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Kline;

    fn candle(coin: &str, d: u32, close: f64) -> Candle {
        Candle::from_kline(
            coin,
            NaiveDate::from_ymd_opt(2024, 4, d).unwrap(),
            &Kline {
                open: close - 1.0,
                high: close + 2.0,
                low: close - 2.0,
                close,
                volume: 100.0,
                taker_buy_volume: 60.0,
            },
        )
    }

    #[test]
    fn test_candles_survive_csv() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvCandleSource::new(dir.path());
        let candles = vec![candle("BTC", 1, 100.0), candle("BTC", 2, 101.0)];
        write_candles(source.path_for("btc"), &candles).unwrap();

        let loaded = source.load("BTC").unwrap();
        assert_eq!(loaded, candles);
    }

    #[test]
    fn test_unordered_history_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ETH.csv");
        let candles = vec![candle("ETH", 2, 100.0), candle("ETH", 2, 101.0)];
        write_candles(&path, &candles).unwrap();

        let err = load_candles(&path).unwrap_err();
        assert!(matches!(err, SentinelError::UnorderedHistory { .. }));
    }

    #[test]
    fn test_missing_history() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvCandleSource::new(dir.path()).load("SOL").unwrap_err();
        assert!(matches!(err, SentinelError::MissingHistory { ref coin, .. } if coin == "SOL"));
    }

    #[test]
    fn test_wrong_coin_in_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvCandleSource::new(dir.path());
        let candles = vec![candle("BTC", 1, 100.0), candle("ETH", 2, 101.0)];
        write_candles(source.path_for("BTC"), &candles).unwrap();

        let err = source.load("btc").unwrap_err();
        assert!(matches!(
            err,
            SentinelError::CoinMismatch { ref expected, ref found, .. }
                if expected == "BTC" && found == "ETH"
        ));
    }

    #[test]
    fn test_alert_metadata_column() {
        let mut draft = AlertDraft::new(
            "BTC",
            NaiveDate::from_ymd_opt(2024, 4, 3).unwrap(),
            AlertType::VolumeSpike,
            "Unusual volume spike detected (Z-score: 3.10)",
        );
        draft.zscore = Some(3.1);
        draft.metadata.avg_volume = Some(1234.5);
        let spike = Alert::new(draft, Severity::High);

        let mut whale = AlertDraft::new(
            "BTC",
            NaiveDate::from_ymd_opt(2024, 4, 3).unwrap(),
            AlertType::WhaleBuy,
            "Large buy pressure detected: $6,000,000",
        );
        whale.size_class = Some(SizeClass::LargeWhale);
        whale.value_usd = Some(6_000_000.0);
        let whale = Alert::new(whale, Severity::High);

        let record = AlertRecord::from_alert(&spike).unwrap();
        assert_eq!(record.metadata, r#"{"avg_volume":1234.5}"#);
        assert_eq!(AlertRecord::from_alert(&whale).unwrap().metadata, "");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.csv");
        write_alerts(&path, &[spike.clone(), whale.clone()]).unwrap();
        assert_eq!(read_alerts(&path).unwrap(), vec![spike, whale]);
    }
}
