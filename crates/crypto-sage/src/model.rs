//! Domain Models
//!
//! Inputs and outputs of the analysis engines. Indicator math runs on `f64`:
//! these are derived levels and ratios, not ledger balances.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SageError};
use crate::numeric::is_present;

/// Normalized indicator readings for one asset at one point in time
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Last traded price
    pub current_price: Option<f64>,

    /// 50-period simple moving average
    pub sma50: Option<f64>,

    /// 200-period simple moving average
    pub sma200: Option<f64>,

    /// Relative strength index, 0..100
    pub rsi: Option<f64>,

    /// MACD line value
    pub macd: Option<f64>,

    /// Volatility as a fraction of price (0.03 = 3%)
    pub volatility: Option<f64>,
}

impl MarketSnapshot {
    pub fn new(current_price: f64) -> Self {
        Self {
            current_price: Some(current_price),
            ..Default::default()
        }
    }

    pub fn with_moving_averages(mut self, sma50: Option<f64>, sma200: Option<f64>) -> Self {
        self.sma50 = sma50;
        self.sma200 = sma200;
        self
    }

    pub fn with_momentum(mut self, rsi: Option<f64>, macd: Option<f64>) -> Self {
        self.rsi = rsi;
        self.macd = macd;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    /// Current price if usable (finite and strictly positive)
    pub fn price(&self) -> Option<f64> {
        self.current_price.filter(|p| p.is_finite() && *p > 0.0)
    }

    pub fn sma50(&self) -> Option<f64> {
        self.sma50.filter(|v| is_present(*v))
    }

    pub fn sma200(&self) -> Option<f64> {
        self.sma200.filter(|v| is_present(*v))
    }

    /// Moving-average trend: SMA50 above SMA200 is bullish, below is bearish
    pub fn trend(&self) -> Trend {
        match (self.sma50(), self.sma200()) {
            (Some(fast), Some(slow)) if fast > slow => Trend::Bullish,
            (Some(fast), Some(slow)) if fast < slow => Trend::Bearish,
            _ => Trend::Neutral,
        }
    }
}

/// Market trend classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
    /// No usable price, nothing was derived
    Unknown,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "bullish"),
            Trend::Bearish => write!(f, "bearish"),
            Trend::Neutral => write!(f, "neutral"),
            Trend::Unknown => write!(f, "unknown"),
        }
    }
}

/// Trade direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// Venue a scenario is sized for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Spot,
    Futures,
}

/// A single trade setup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeScenario {
    pub market: MarketKind,

    pub side: Side,

    /// Trend the scenario was derived under
    pub bias: Trend,

    pub entry: f64,

    pub stop_loss: f64,

    /// TP1..TP3, moving further from entry in the trade direction.
    /// `None` when entry and stop coincide.
    pub targets: Option<[f64; 3]>,

    /// Human-readable notes keyed by topic
    pub rationale: BTreeMap<String, String>,
}

impl TradeScenario {
    /// Distance between entry and stop
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }
}

/// The four scenarios produced per analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub spot_long: TradeScenario,
    pub spot_short: TradeScenario,
    pub futures_long: TradeScenario,
    pub futures_short: TradeScenario,
}

impl ScenarioSet {
    pub fn iter(&self) -> impl Iterator<Item = &TradeScenario> {
        [
            &self.spot_long,
            &self.spot_short,
            &self.futures_long,
            &self.futures_short,
        ]
        .into_iter()
    }

    pub fn get(&self, market: MarketKind, side: Side) -> &TradeScenario {
        match (market, side) {
            (MarketKind::Spot, Side::Long) => &self.spot_long,
            (MarketKind::Spot, Side::Short) => &self.spot_short,
            (MarketKind::Futures, Side::Long) => &self.futures_long,
            (MarketKind::Futures, Side::Short) => &self.futures_short,
        }
    }
}

/// Result of the classical scenario engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassicalAnalysis {
    pub trend: Trend,

    /// Absent only when the snapshot had no usable price
    pub scenarios: Option<ScenarioSet>,
}

impl ClassicalAnalysis {
    /// Sentinel for a snapshot without a usable price
    pub fn unknown() -> Self {
        Self {
            trend: Trend::Unknown,
            scenarios: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.trend == Trend::Unknown
    }
}

/// One OHLC bar
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp: None,
            open,
            high,
            low,
            close,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Ordered candle series, indexed by arrival order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OhlcSeries {
    candles: Vec<Candle>,
}

impl OhlcSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    /// Reject non-positive or inverted candles
    pub fn validate(&self) -> Result<()> {
        for (i, c) in self.candles.iter().enumerate() {
            let prices = [c.open, c.high, c.low, c.close];
            if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
                return Err(SageError::InvalidInput(format!(
                    "candle {} has a non-positive price",
                    i
                )));
            }
            if c.high < c.low {
                return Err(SageError::InvalidInput(format!(
                    "candle {} has high {} below low {}",
                    i, c.high, c.low
                )));
            }
        }
        Ok(())
    }
}

impl From<Vec<Candle>> for OhlcSeries {
    fn from(candles: Vec<Candle>) -> Self {
        Self::new(candles)
    }
}
