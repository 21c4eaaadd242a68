//! Market Data Integration
//!
//! Provider abstraction for prices, market pages, scanner technicals and
//! OHLC history, plus normalization into the classical engine's snapshot.

mod derived;
mod indicators;
mod interval;
mod live;
mod mock;

pub use derived::{rsi, sma, volatility};
pub use indicators::{
    field_codes, format_usd, interpret_indicator, interpret_recommendation, IndicatorEntry,
    IndicatorSheet, IndicatorValue, TECHNICAL_FIELDS,
};
pub use interval::Interval;
pub use live::{CoinGeckoClient, CoinGeckoConfig, LiveMarketData, TradingViewClient, TradingViewConfig};
pub use mock::MockMarketData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{MarketSnapshot, OhlcSeries};
use crate::numeric::first_present;

/// Spot quote in USD
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpotPrice {
    pub price: f64,
    /// 24h change, percent
    pub change_24h: f64,
    pub timestamp: DateTime<Utc>,
}

/// One forecast row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    pub period: String,
    pub price: f64,
    /// Relative change from the current price
    pub change: f64,
}

/// Market page for a coin: headline indicators and sentiment
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketData {
    pub current_price: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi_14: Option<f64>,
    /// Fraction of price (0.03 = 3%)
    pub volatility: Option<f64>,
    pub sentiment: Option<String>,
    /// Scraped-page fields; the live provider leaves these empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fear_greed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green_days: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub predictions: Vec<PricePrediction>,
}

/// Market data provider trait
///
/// Implement this per data source. Every method is independent so callers
/// can fan requests out concurrently.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Resolve a ticker ("BTC") to the provider's coin id ("bitcoin")
    async fn resolve_coin_id(&self, symbol: &str) -> Result<Option<String>>;

    async fn spot_price(&self, coin_id: &str) -> Result<SpotPrice>;

    async fn market_data(&self, coin_id: &str) -> Result<MarketData>;

    /// Scanner technicals for a ticker at an interval
    async fn technicals(&self, symbol: &str, interval: Interval) -> Result<IndicatorSheet>;

    /// OHLC candles covering the last `days` days, oldest first
    async fn ohlc(&self, coin_id: &str, days: u32) -> Result<OhlcSeries>;

    /// Provider name
    fn name(&self) -> &str;
}

impl MarketSnapshot {
    /// Combine a market page and a scanner sheet into one snapshot.
    ///
    /// Each field takes the first present reading in this order:
    ///
    /// | field      | market page     | scanner sheet                      |
    /// |------------|-----------------|------------------------------------|
    /// | price      | `current_price` | `close`, `price`                   |
    /// | sma50      | `sma50`         | `sma50`, `sma 50`                  |
    /// | sma200     | `sma200`        | `sma200`, `sma 200`                |
    /// | rsi        | `rsi_14`        | `rsi`, `relative strength index`   |
    /// | macd       |                 | `macd`                             |
    /// | volatility | `volatility`    | `volatility` (percent)             |
    pub fn normalize(market: &MarketData, sheet: &IndicatorSheet) -> Self {
        let money = |needles: &[&str]| sheet.lookup(needles).and_then(IndicatorValue::money);
        let signed = |needles: &[&str]| sheet.lookup(needles).and_then(IndicatorValue::signed);

        Self {
            current_price: first_present([market.current_price, money(&["close", "price"])]),
            sma50: first_present([market.sma50, money(&["sma50", "sma 50"])]),
            sma200: first_present([market.sma200, money(&["sma200", "sma 200"])]),
            rsi: first_present([market.rsi_14, signed(&["rsi", "relative strength index"])]),
            macd: signed(&["macd"]),
            volatility: first_present([
                market.volatility,
                sheet.lookup(&["volatility"]).and_then(IndicatorValue::percent),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefers_market_page() {
        let market = MarketData {
            current_price: Some(100.0),
            sma50: Some(105.0),
            volatility: Some(0.05),
            ..Default::default()
        };
        let mut sheet = IndicatorSheet::new();
        sheet.push("close", "Closing Price (Daily)", IndicatorValue::Text("$99.00".into()));
        sheet.push("SMA200", "Simple Moving Average (200) (Daily)", IndicatorValue::Text("$95.00".into()));
        sheet.push("RSI", "Relative Strength Index (RSI) (Daily)", IndicatorValue::Text("50.00 (Neutral)".into()));
        sheet.push("MACD.macd", "MACD Line (Daily)", IndicatorValue::Text("1.00 (Bullish)".into()));

        let snapshot = MarketSnapshot::normalize(&market, &sheet);
        assert_eq!(snapshot.current_price, Some(100.0));
        assert_eq!(snapshot.sma50, Some(105.0));
        assert_eq!(snapshot.sma200, Some(95.0));
        assert_eq!(snapshot.rsi, Some(50.0));
        assert_eq!(snapshot.macd, Some(1.0));
        assert_eq!(snapshot.volatility, Some(0.05));
    }

    #[test]
    fn test_missing_page_fields_are_omitted() {
        let market = MarketData {
            current_price: Some(100.0),
            sentiment: Some("Bullish".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&market).unwrap();
        assert_eq!(json["sentiment"], "Bullish");
        assert!(json.get("fear_greed").is_none());
        assert!(json.get("green_days").is_none());
        assert!(json.get("predictions").is_none());

        let back: MarketData = serde_json::from_value(json).unwrap();
        assert_eq!(back, market);
    }

    #[test]
    fn test_normalize_zero_falls_through() {
        let market = MarketData {
            current_price: Some(0.0),
            ..Default::default()
        };
        let mut sheet = IndicatorSheet::new();
        sheet.push("close", "Closing Price", IndicatorValue::Number(42.5));
        sheet.push("volatility", "Volatility", IndicatorValue::Text("3.5%".into()));

        let snapshot = MarketSnapshot::normalize(&market, &sheet);
        assert_eq!(snapshot.current_price, Some(42.5));
        assert!((snapshot.volatility.unwrap() - 0.035).abs() < 1e-12);
        assert!(snapshot.sma50.is_none());
        assert!(snapshot.macd.is_none());
    }
}
