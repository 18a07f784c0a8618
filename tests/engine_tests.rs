//! Integration tests for the indicator and anomaly detection engine

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use volume_sentinel::config::AppConfig;
    use volume_sentinel::detection::{AnomalyDetector, FuturesAnomalyDetector, SeverityClassifier};
    use volume_sentinel::features::{
        compute_bollinger, compute_divergence, compute_macd, compute_rsi, compute_vwap,
        IndicatorEngine,
    };
    use volume_sentinel::persistence::{AlertFilter, AlertStore};
    use volume_sentinel::scanner::AlertScanner;
    use volume_sentinel::types::{
        AlertDraft, AlertType, Candle, DivergenceSignal, EnrichedCandle, FuturesQuote,
        FuturesSnapshot, Kline, Severity, SizeClass,
    };

    fn day(i: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i)
    }

    fn make_candle(i: i64, close: f64, volume: f64, buy: f64) -> Candle {
        Candle::from_kline(
            "BTC",
            day(i),
            &Kline {
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume,
                taker_buy_volume: buy,
            },
        )
    }

    fn wavy_history(days: i64) -> Vec<Candle> {
        (0..days)
            .map(|i| {
                let close = 40_000.0 + 500.0 * ((i as f64) / 3.0).sin();
                let volume = 1_000.0 + 25.0 * (i % 4) as f64;
                make_candle(i, close, volume, volume / 2.0)
            })
            .collect()
    }

    // ============================================================================
    // Indicator engine
    // ============================================================================

    #[test]
    fn test_rsi_needs_fifteen_closes() {
        let closes: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        assert!(compute_rsi(&closes, 14).iter().all(Option::is_none));

        let closes: Vec<f64> = (0..15).map(|i| 100.0 + (i % 3) as f64).collect();
        let rsi = compute_rsi(&closes, 14);
        assert_eq!(rsi.iter().filter(|v| v.is_some()).count(), 1);
        assert!(rsi[14].is_some());
    }

    #[test]
    fn test_vwap_with_zero_volume_is_close() {
        let candles: Vec<Candle> = (0..10)
            .map(|i| make_candle(i, 100.0 + i as f64, 0.0, 0.0))
            .collect();
        let vwap = compute_vwap(&candles);
        for (v, c) in vwap.iter().zip(&candles) {
            assert_eq!(*v, c.close);
        }
    }

    #[test]
    fn test_bollinger_middle_is_trailing_average() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + ((i * 7) % 11) as f64).collect();
        let bands = compute_bollinger(&closes, 20, 2.0);

        for i in 19..30 {
            let expected: f64 = closes[i - 19..=i].iter().sum::<f64>() / 20.0;
            let middle = bands.middle[i].unwrap();
            assert!((middle - expected).abs() < 1e-9);
            assert!(bands.upper[i].unwrap() >= middle);
            assert!(bands.lower[i].unwrap() <= middle);
        }
        assert!(bands.middle[18].is_none());
    }

    #[test]
    fn test_macd_signal_starts_after_slow_plus_signal() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 / 4.0).cos() * 5.0).collect();
        let macd = compute_macd(&closes, 12, 26, 9);

        assert_eq!(macd.signal.len(), 60);
        assert!(macd.macd[24].is_none());
        assert!(macd.macd[25].is_some());
        assert!(macd.signal[32].is_none());
        assert!(macd.signal[33].is_some());
        let hist = macd.histogram[40].unwrap();
        assert!((hist - (macd.macd[40].unwrap() - macd.signal[40].unwrap())).abs() < 1e-12);
    }

    #[test]
    fn test_falling_price_with_accumulation_is_bullish() {
        let closes = [105.0, 104.0, 103.0, 102.0, 101.0];
        let nets = [10.0, -2.0, 5.0, 1.0, 3.0];
        let div = compute_divergence(&closes, &nets, 4);
        assert_eq!(div[4], Some(DivergenceSignal::Bullish));
        assert!(div[..4].iter().all(Option::is_none));
    }

    #[test]
    fn test_enrich_keeps_order_and_length() {
        let candles = wavy_history(50);
        let enriched = IndicatorEngine::default().enrich(&candles);

        assert_eq!(enriched.len(), candles.len());
        for (e, c) in enriched.iter().zip(&candles) {
            assert_eq!(&e.candle, c);
        }
        assert!(enriched[13].rsi.is_none());
        assert!(enriched[14].rsi.is_some());
        assert!(enriched[18].volume_zscore.is_none());
        assert!(enriched[19].volume_zscore.is_some());
        assert!(enriched[3].divergence_signal.is_none());
        assert!(enriched[4].divergence_signal.is_some());
        assert!(IndicatorEngine::default().enrich(&[]).is_empty());
    }

    // ============================================================================
    // Detection and severity
    // ============================================================================

    #[test]
    fn test_lone_large_buy_is_one_whale_buy() {
        let mut candle = make_candle(0, 50_000.0, 10.0, 5.0);
        candle.buy_volume_usd = 6_000_000.0;
        candle.sell_volume_usd = 0.0;
        candle.net_volume_usd = 0.0;
        let current = EnrichedCandle::from(candle);

        let drafts = AnomalyDetector::default().detect_all(&current, &[]);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].alert_type, AlertType::WhaleBuy);
        assert_eq!(drafts[0].size_class, Some(SizeClass::LargeWhale));
        assert_eq!(drafts[0].description, "Large buy pressure detected: $6,000,000");

        let alert = SeverityClassifier::default().finalize(drafts[0].clone());
        assert_eq!(alert.severity, Severity::High);
    }

    #[test]
    fn test_whale_and_volume_spike_same_day() {
        let history: Vec<EnrichedCandle> = wavy_history(20).into_iter().map(Into::into).collect();
        let mut current = make_candle(20, 40_000.0, 5_000.0, 4_000.0);
        current.buy_volume_usd = 160_000_000.0;
        current.sell_volume_usd = 40_000_000.0;
        current.net_volume_usd = 120_000_000.0;

        let drafts = AnomalyDetector::default().detect_all(&current.into(), &history);
        let types: Vec<AlertType> = drafts.iter().map(|d| d.alert_type).collect();
        assert_eq!(
            types,
            vec![
                AlertType::WhaleBuy,
                AlertType::WhaleSell,
                AlertType::WhaleAccumulation,
                AlertType::VolumeSpike,
                AlertType::BuyVolumeSpike,
                AlertType::SellVolumeSpike,
            ]
        );

        let store = AlertStore::new();
        for alert in SeverityClassifier::default().finalize_all(drafts) {
            assert!(store.upsert(alert));
        }
        assert_eq!(store.len(), 6);
        assert_eq!(store.query(&AlertFilter::for_coin("BTC")).len(), 6);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let candles = wavy_history(45);
        let enriched = IndicatorEngine::default().enrich(&candles);
        let detector = AnomalyDetector::default();

        let run = || {
            let drafts: Vec<AlertDraft> = (0..enriched.len())
                .flat_map(|i| detector.detect_all(&enriched[i], &enriched[i.saturating_sub(30)..i]))
                .collect();
            serde_json::to_string(&drafts).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_medium_whale_with_extreme_zscore_is_critical() {
        let mut draft = AlertDraft::new("ETH", day(0), AlertType::BuyVolumeSpike, "spike");
        draft.size_class = Some(SizeClass::MediumWhale);
        draft.zscore = Some(3.6);
        assert_eq!(SeverityClassifier::default().classify(&draft), Severity::Critical);
    }

    // ============================================================================
    // Futures
    // ============================================================================

    #[test]
    fn test_futures_quiet_and_overheated() {
        let detector = FuturesAnomalyDetector::default();

        let quiet = FuturesSnapshot::from_quotes(
            "BTC",
            day(0),
            Some(100.0),
            &FuturesQuote {
                mark_price: 100.2,
                index_price: 100.0,
                funding_rate: 0.00002,
                open_interest: None,
            },
        );
        assert!(detector.detect(&quiet).is_empty());

        let hot = FuturesSnapshot {
            coin: "BTC".to_string(),
            symbol: "BTCUSDT".to_string(),
            date: day(0),
            spot_price: 100.0,
            futures_price: 101.2,
            premium_pct: 1.2,
            funding_rate: 0.0011,
            funding_rate_annualized: 120.0,
            open_interest: None,
        };
        let alerts = detector.detect(&hot);
        let premium = alerts
            .iter()
            .find(|a| a.alert_type() == AlertType::HighFuturesPremium)
            .unwrap();
        let funding = alerts
            .iter()
            .find(|a| a.alert_type() == AlertType::ExtremeFundingRate)
            .unwrap();
        assert_eq!(premium.severity, Severity::High);
        assert_eq!(funding.severity, Severity::Critical);
    }

    // ============================================================================
    // Scanner
    // ============================================================================

    #[test]
    fn test_scanner_matches_manual_pipeline() {
        let config = AppConfig::default();
        let scanner = AlertScanner::new(&config);
        let mut candles = wavy_history(40);
        candles[39].sell_volume_usd = 11_000_000.0;

        let alerts = scanner.scan_recent(&candles);
        let mega = alerts
            .iter()
            .find(|a| a.alert_type() == AlertType::WhaleSell)
            .unwrap();
        assert_eq!(mega.severity, Severity::Critical);
        assert_eq!(mega.draft.date, day(39));

        // alerts come out in date order
        let dates: Vec<NaiveDate> = alerts.iter().map(|a| a.draft.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }
}
