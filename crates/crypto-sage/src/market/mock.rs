//! Mock Market Data
//!
//! For testing and demo purposes. Returns static quotes and a deterministic
//! rising zigzag price history.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

use super::{
    IndicatorSheet, Interval, MarketData, MarketDataProvider, PricePrediction, SpotPrice,
};
use crate::error::{Result, SageError};
use crate::model::{Candle, OhlcSeries};

/// Zigzag offsets, percent of the trend price
const WAVE: [f64; 8] = [-4.0, -2.0, 0.0, 2.0, 4.0, 2.0, 0.0, -2.0];

/// Candles returned regardless of the requested span
const MOCK_CANDLES: usize = 120;

/// Mock provider with static quotes
#[derive(Clone, Debug, Default)]
pub struct MockMarketData;

impl MockMarketData {
    pub fn new() -> Self {
        Self
    }

    /// (coin id, symbol, price, 24h change %)
    fn asset(&self, key: &str) -> Option<(&'static str, &'static str, f64, f64)> {
        match key.to_lowercase().as_str() {
            "btc" | "bitcoin" => Some(("bitcoin", "BTC", 97_500.0, 2.5)),
            "eth" | "ethereum" => Some(("ethereum", "ETH", 3_450.0, 1.8)),
            "sol" | "solana" => Some(("solana", "SOL", 195.0, 4.2)),
            "bnb" | "binancecoin" => Some(("binancecoin", "BNB", 690.0, 0.6)),
            "ada" | "cardano" => Some(("cardano", "ADA", 0.95, -1.2)),
            "xrp" | "ripple" => Some(("ripple", "XRP", 2.35, 0.9)),
            "doge" | "dogecoin" => Some(("dogecoin", "DOGE", 0.38, 12.0)),
            "link" | "chainlink" => Some(("chainlink", "LINK", 24.5, 3.1)),
            "avax" | "avalanche-2" => Some(("avalanche-2", "AVAX", 42.0, 5.5)),
            "ltc" | "litecoin" => Some(("litecoin", "LTC", 105.0, 1.5)),
            _ => None,
        }
    }

    fn quote(&self, key: &str) -> Result<(&'static str, &'static str, f64, f64)> {
        self.asset(key)
            .ok_or_else(|| SageError::UnsupportedAsset(key.to_string()))
    }

    /// Rising zigzag ending near `price`
    fn history(price: f64, days: u32) -> OhlcSeries {
        let step = Duration::minutes(i64::from(days.max(1)) * 24 * 60 / MOCK_CANDLES as i64);
        let start = Utc::now() - step * MOCK_CANDLES as i32;
        let last = (MOCK_CANDLES - 1) as f64;

        let mut prev_close = None;
        (0..MOCK_CANDLES)
            .map(|i| {
                let trend = price * (0.85 + 0.15 * i as f64 / last);
                let close = trend * (1.0 + WAVE[i % WAVE.len()] / 100.0);
                let open = prev_close.unwrap_or(close);
                prev_close = Some(close);
                Candle::new(open, open.max(close) * 1.004, open.min(close) * 0.996, close)
                    .with_timestamp(start + step * i as i32)
            })
            .collect::<Vec<_>>()
            .into()
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketData {
    async fn resolve_coin_id(&self, symbol: &str) -> Result<Option<String>> {
        Ok(self.asset(symbol).map(|(id, ..)| id.to_string()))
    }

    async fn spot_price(&self, coin_id: &str) -> Result<SpotPrice> {
        let (_, _, price, change_24h) = self.quote(coin_id)?;
        Ok(SpotPrice {
            price,
            change_24h,
            timestamp: Utc::now(),
        })
    }

    async fn market_data(&self, coin_id: &str) -> Result<MarketData> {
        let (_, _, price, change_24h) = self.quote(coin_id)?;
        let sentiment = if change_24h > 2.0 {
            "Bullish"
        } else if change_24h < -2.0 {
            "Bearish"
        } else {
            "Neutral"
        };

        Ok(MarketData {
            current_price: Some(price),
            sma50: Some(price * 0.97),
            sma200: Some(price * 0.90),
            rsi_14: Some(56.0),
            volatility: Some(0.035),
            sentiment: Some(sentiment.to_string()),
            fear_greed: Some("62 (Greed)".to_string()),
            green_days: Some("17/30 (57%)".to_string()),
            predictions: vec![
                PricePrediction {
                    period: "5 days".to_string(),
                    price: price * 1.02,
                    change: 0.02,
                },
                PricePrediction {
                    period: "1 month".to_string(),
                    price: price * 1.06,
                    change: 0.06,
                },
            ],
        })
    }

    async fn technicals(&self, symbol: &str, interval: Interval) -> Result<IndicatorSheet> {
        let (_, _, price, _) = self.quote(symbol)?;
        let key = |code: &str| match interval.field_suffix() {
            Some(suffix) => format!("{}|{}", code, suffix),
            None => code.to_string(),
        };

        let mut raw = Map::new();
        for (code, value) in [
            ("Recommend.All", json!(0.3)),
            ("RSI", json!(56.0)),
            ("MACD.macd", json!(price * 0.004)),
            ("MACD.signal", json!(price * 0.003)),
            ("close", json!(price)),
            ("SMA50", json!(price * 0.97)),
            ("SMA200", json!(price * 0.90)),
            ("ADX", Value::Null),
        ] {
            raw.insert(key(code), value);
        }

        Ok(IndicatorSheet::from_raw(&raw, interval))
    }

    async fn ohlc(&self, coin_id: &str, days: u32) -> Result<OhlcSeries> {
        let (_, _, price, _) = self.quote(coin_id)?;
        Ok(Self::history(price, days))
    }

    fn name(&self) -> &str {
        "MockMarketData"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MarketSnapshot;

    #[tokio::test]
    async fn test_mock_quotes() {
        let market = MockMarketData::new();

        assert_eq!(market.resolve_coin_id("BTC").await.unwrap().as_deref(), Some("bitcoin"));
        assert!(market.resolve_coin_id("NOTREAL").await.unwrap().is_none());

        let spot = market.spot_price("bitcoin").await.unwrap();
        assert_eq!(spot.price, 97_500.0);
        assert!(market.spot_price("NOTREAL").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_snapshot_is_bullish() {
        let market = MockMarketData::new();
        let page = market.market_data("ethereum").await.unwrap();
        let sheet = market.technicals("ETH", Interval::FourHours).await.unwrap();

        let snapshot = MarketSnapshot::normalize(&page, &sheet);
        assert_eq!(snapshot.current_price, Some(3_450.0));
        assert!(snapshot.macd.unwrap() > 0.0);
        assert_eq!(snapshot.trend(), crate::model::Trend::Bullish);
    }

    #[tokio::test]
    async fn test_mock_history_is_valid() {
        let series = MockMarketData::new().ohlc("solana", 30).await.unwrap();
        assert_eq!(series.len(), MOCK_CANDLES);
        assert!(series.validate().is_ok());

        let candles = series.candles();
        assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}
