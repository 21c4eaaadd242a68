//! Live Market Data
//!
//! CoinGecko for quotes, history and coin search; the TradingView scanner
//! for technicals. The market page is derived from daily closes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{
    field_codes, IndicatorSheet, Interval, MarketData, MarketDataProvider, SpotPrice,
};
use crate::error::{Result, SageError};
use crate::model::{Candle, OhlcSeries};

const COINGECKO_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Daily closes fetched to derive the market page
const MARKET_PAGE_DAYS: u32 = 365;

/// 24h move beyond which sentiment leaves neutral, percent
const SENTIMENT_MOVE_PCT: f64 = 2.0;

/// CoinGecko client configuration
#[derive(Clone, Debug)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl CoinGeckoConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("COINGECKO_BASE_URL")
            .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".into());
        let api_key = std::env::var("COINGECKO_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            ..Default::default()
        }
    }
}

/// TradingView scanner configuration
#[derive(Clone, Debug)]
pub struct TradingViewConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for TradingViewConfig {
    fn default() -> Self {
        Self {
            base_url: "https://scanner.tradingview.com".into(),
            timeout_secs: 30,
        }
    }
}

impl TradingViewConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("TRADINGVIEW_BASE_URL")
            .unwrap_or_else(|_| "https://scanner.tradingview.com".into());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }
}

fn http_client(headers: HeaderMap, timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(SageError::from)
}

/// GET `url` and decode JSON, mapping non-2xx statuses to provider errors
async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T> {
    let response = client.get(url).query(query).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(SageError::Provider(format!("{} returned {}: {}", url, status, text)));
    }

    Ok(response.json().await?)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchCoin>,
}

#[derive(Debug, Deserialize)]
struct SearchCoin {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: f64,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<(f64, f64)>,
}

/// CoinGecko REST client
pub struct CoinGeckoClient {
    client: reqwest::Client,
    config: CoinGeckoConfig,
}

impl CoinGeckoClient {
    pub fn new(config: CoinGeckoConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| SageError::Config(format!("invalid COINGECKO_API_KEY: {}", e)))?;
            headers.insert(HeaderName::from_static(COINGECKO_KEY_HEADER), value);
        }

        Ok(Self {
            client: http_client(headers, config.timeout_secs)?,
            config,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url, endpoint.trim_start_matches('/'))
    }

    /// First search hit for a symbol or name
    pub async fn search_coin_id(&self, query: &str) -> Result<Option<String>> {
        let found: SearchResponse =
            get_json(&self.client, &self.url("search"), &[("query", query.to_string())]).await?;
        Ok(found.coins.into_iter().next().map(|c| c.id))
    }

    pub async fn price(&self, coin_id: &str) -> Result<SpotPrice> {
        let quotes: std::collections::HashMap<String, SimplePrice> = get_json(
            &self.client,
            &self.url("simple/price"),
            &[
                ("ids", coin_id.to_string()),
                ("vs_currencies", "usd".to_string()),
                ("include_24hr_change", "true".to_string()),
            ],
        )
        .await?;

        let quote = quotes
            .get(coin_id)
            .ok_or_else(|| SageError::UnsupportedAsset(coin_id.to_string()))?;

        Ok(SpotPrice {
            price: quote.usd,
            change_24h: quote.usd_24h_change.unwrap_or(0.0),
            timestamp: Utc::now(),
        })
    }

    /// OHLC candles, oldest first
    pub async fn ohlc(&self, coin_id: &str, days: u32) -> Result<OhlcSeries> {
        let rows: Vec<[f64; 5]> = get_json(
            &self.client,
            &self.url(&format!("coins/{}/ohlc", coin_id)),
            &[("vs_currency", "usd".to_string()), ("days", days.to_string())],
        )
        .await?;

        let mut candles: Vec<Candle> = rows
            .into_iter()
            .map(|[ts, open, high, low, close]| {
                let candle = Candle::new(open, high, low, close);
                match DateTime::from_timestamp_millis(ts as i64) {
                    Some(at) => candle.with_timestamp(at),
                    None => candle,
                }
            })
            .collect();
        candles.sort_by_key(|c| c.timestamp);

        debug!(coin_id, days, candles = candles.len(), "fetched ohlc");
        Ok(OhlcSeries::new(candles))
    }

    /// Daily close prices, oldest first
    pub async fn daily_closes(&self, coin_id: &str, days: u32) -> Result<Vec<f64>> {
        let chart: MarketChart = get_json(
            &self.client,
            &self.url(&format!("coins/{}/market_chart", coin_id)),
            &[
                ("vs_currency", "usd".to_string()),
                ("days", days.to_string()),
                ("interval", "daily".to_string()),
            ],
        )
        .await?;

        Ok(chart.prices.into_iter().map(|(_, price)| price).collect())
    }
}

/// TradingView scanner client
pub struct TradingViewClient {
    client: reqwest::Client,
    config: TradingViewConfig,
}

impl TradingViewClient {
    pub fn new(config: TradingViewConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            client: http_client(headers, config.timeout_secs)?,
            config,
        })
    }

    /// Raw scanner fields for `CRYPTO:{SYMBOL}USD`
    pub async fn raw_technicals(&self, symbol: &str, interval: Interval) -> Result<Map<String, Value>> {
        let url = format!("{}/symbol", self.config.base_url);
        get_json(
            &self.client,
            &url,
            &[
                ("symbol", format!("CRYPTO:{}USD", symbol.to_uppercase())),
                ("fields", field_codes(interval).join(",")),
                ("no_404", "true".to_string()),
                ("label-product", "popup-technicals".to_string()),
            ],
        )
        .await
    }

    pub async fn technicals(&self, symbol: &str, interval: Interval) -> Result<IndicatorSheet> {
        let raw = self.raw_technicals(symbol, interval).await?;
        Ok(IndicatorSheet::from_raw(&raw, interval))
    }
}

/// Live provider over CoinGecko and TradingView
pub struct LiveMarketData {
    coingecko: CoinGeckoClient,
    tradingview: TradingViewClient,
}

impl LiveMarketData {
    pub fn new(coingecko: CoinGeckoConfig, tradingview: TradingViewConfig) -> Result<Self> {
        Ok(Self {
            coingecko: CoinGeckoClient::new(coingecko)?,
            tradingview: TradingViewClient::new(tradingview)?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(CoinGeckoConfig::from_env(), TradingViewConfig::from_env())
    }
}

#[async_trait]
impl MarketDataProvider for LiveMarketData {
    async fn resolve_coin_id(&self, symbol: &str) -> Result<Option<String>> {
        self.coingecko.search_coin_id(symbol).await
    }

    async fn spot_price(&self, coin_id: &str) -> Result<SpotPrice> {
        self.coingecko.price(coin_id).await
    }

    async fn market_data(&self, coin_id: &str) -> Result<MarketData> {
        let closes = self.coingecko.daily_closes(coin_id, MARKET_PAGE_DAYS).await?;
        let series: OhlcSeries = closes
            .iter()
            .map(|c| Candle::new(*c, *c, *c, *c))
            .collect::<Vec<_>>()
            .into();

        let mut page = MarketData::from_series(&series);
        if page.sma200.is_none() {
            warn!(coin_id, closes = closes.len(), "not enough history for sma200");
        }

        if let [.., prev, last] = closes.as_slice() {
            let change = (last - prev) / prev * 100.0;
            let sentiment = if change > SENTIMENT_MOVE_PCT {
                "Bullish"
            } else if change < -SENTIMENT_MOVE_PCT {
                "Bearish"
            } else {
                "Neutral"
            };
            page.sentiment = Some(sentiment.to_string());
        }

        Ok(page)
    }

    async fn technicals(&self, symbol: &str, interval: Interval) -> Result<IndicatorSheet> {
        self.tradingview.technicals(symbol, interval).await
    }

    async fn ohlc(&self, coin_id: &str, days: u32) -> Result<OhlcSeries> {
        self.coingecko.ohlc(coin_id, days).await
    }

    fn name(&self) -> &str {
        "CoinGecko+TradingView"
    }
}
