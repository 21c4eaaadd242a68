//! Classical Scenario Engine
//!
//! Derives spot and futures long/short setups from the moving-average trend,
//! momentum readings and volatility of a [`MarketSnapshot`].
//!
//! ```text
//!   stop offset = 1.5 × volatility × price
//!   targets     = entry ± {1, 2, 3} × |entry − stop|
//!   futures     = stop at 0.7 × spot risk, targets at 1.5 × spot multiples
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    ClassicalAnalysis, MarketKind, MarketSnapshot, ScenarioSet, Side, TradeScenario, Trend,
};

/// Volatility assumed when the snapshot carries none
pub const DEFAULT_VOLATILITY: f64 = 0.03;

/// Extra stop room as a fraction of the volatility move
const STOP_BUFFER_RATIO: f64 = 0.5;

/// Futures risk relative to the spot risk
const FUTURES_RISK_FACTOR: f64 = 0.7;

/// Futures reward multiples relative to the spot multiples
const FUTURES_TARGET_FACTOR: f64 = 1.5;

const LONG_FALLBACK_DISCOUNT: f64 = 0.99;
const SHORT_FALLBACK_PREMIUM: f64 = 1.01;

const RISK_MULTIPLES: [f64; 3] = [1.0, 2.0, 3.0];

/// Engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassicalConfig {
    /// Volatility fraction used when the snapshot has none
    pub default_volatility: f64,
}

impl Default for ClassicalConfig {
    fn default() -> Self {
        Self {
            default_volatility: DEFAULT_VOLATILITY,
        }
    }
}

/// Classical-school scenario builder
#[derive(Clone, Debug, Default)]
pub struct ClassicalAnalyst {
    config: ClassicalConfig,
}

impl ClassicalAnalyst {
    pub fn new(config: ClassicalConfig) -> Self {
        Self { config }
    }

    /// Derive the trend and all four scenarios.
    ///
    /// Returns [`ClassicalAnalysis::unknown`] when the snapshot has no usable
    /// price; every other field has a fallback.
    pub fn derive_scenarios(&self, snapshot: &MarketSnapshot) -> ClassicalAnalysis {
        let Some(price) = snapshot.price() else {
            debug!("snapshot has no usable price, skipping scenario derivation");
            return ClassicalAnalysis::unknown();
        };

        let trend = snapshot.trend();
        let volatility = self.volatility(snapshot);
        let sl_distance = volatility * price;
        let stop_offset = sl_distance + STOP_BUFFER_RATIO * sl_distance;

        let spot_long = self.spot_scenario(snapshot, trend, price, volatility, stop_offset, Side::Long);
        let spot_short = self.spot_scenario(snapshot, trend, price, volatility, stop_offset, Side::Short);
        let futures_long = futures_variant(&spot_long);
        let futures_short = futures_variant(&spot_short);

        debug!(
            %trend,
            price,
            volatility,
            long_entry = spot_long.entry,
            short_entry = spot_short.entry,
            "derived classical scenarios"
        );

        ClassicalAnalysis {
            trend,
            scenarios: Some(ScenarioSet {
                spot_long,
                spot_short,
                futures_long,
                futures_short,
            }),
        }
    }

    fn volatility(&self, snapshot: &MarketSnapshot) -> f64 {
        snapshot
            .volatility
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(self.config.default_volatility)
    }

    fn spot_scenario(
        &self,
        snapshot: &MarketSnapshot,
        trend: Trend,
        price: f64,
        volatility: f64,
        stop_offset: f64,
        side: Side,
    ) -> TradeScenario {
        let aligned = matches!(
            (side, trend),
            (Side::Long, Trend::Bullish) | (Side::Short, Trend::Bearish)
        );

        let (entry, rationale) = if aligned {
            let entry = match snapshot.sma50() {
                Some(sma50) if !momentum_confirms(snapshot, side) => sma50,
                _ => price,
            };
            (entry, trend_rationale(snapshot, volatility))
        } else {
            // Counter-trend: wait for a pullback to SMA50 or a small discount
            let fallback = match side {
                Side::Long => price * LONG_FALLBACK_DISCOUNT,
                Side::Short => price * SHORT_FALLBACK_PREMIUM,
            };
            let note = match side {
                Side::Long => "Reversal/conservative long",
                Side::Short => "Reversal/conservative short",
            };
            (
                snapshot.sma50().unwrap_or(fallback),
                BTreeMap::from([("note".to_string(), note.to_string())]),
            )
        };

        let stop_loss = match side {
            Side::Long => (entry - stop_offset).max(0.0),
            Side::Short => entry + stop_offset,
        };

        TradeScenario {
            market: MarketKind::Spot,
            side,
            bias: trend,
            entry,
            stop_loss,
            targets: targets_from_risk(entry, stop_loss, side),
            rationale,
        }
    }
}

/// TP1..TP3 at 1R, 2R and 3R from entry in the trade direction.
///
/// `None` when entry and stop coincide.
pub fn targets_from_risk(entry: f64, stop: f64, side: Side) -> Option<[f64; 3]> {
    let risk = (entry - stop).abs();
    if !(risk > 0.0) {
        return None;
    }
    Some(RISK_MULTIPLES.map(|k| entry + side.sign() * k * risk))
}

/// Leveraged variant of a spot scenario: same entry, stop pulled in to 0.7×
/// the spot risk, targets pushed out to 1.5× the spot risk multiples.
pub fn futures_variant(spot: &TradeScenario) -> TradeScenario {
    let sign = spot.side.sign();
    let spot_risk = spot.risk();
    let stop_loss = spot.entry - sign * FUTURES_RISK_FACTOR * spot_risk;

    // Scaled from the spot stop, not re-derived from the tighter one
    let targets = targets_from_risk(spot.entry, spot.stop_loss, spot.side)
        .map(|tps| tps.map(|tp| spot.entry + (tp - spot.entry) * FUTURES_TARGET_FACTOR));

    let mut rationale = spot.rationale.clone();
    rationale.insert("type".into(), "futures".into());

    TradeScenario {
        market: MarketKind::Futures,
        stop_loss,
        targets,
        rationale,
        ..spot.clone()
    }
}

/// Momentum agrees with the trade: MACD on the trade's side of zero, or RSI
/// away from either extreme
fn momentum_confirms(snapshot: &MarketSnapshot, side: Side) -> bool {
    let macd_ok = snapshot.macd.is_some_and(|m| match side {
        Side::Long => m > 0.0,
        Side::Short => m < 0.0,
    });
    let rsi_ok = snapshot.rsi.is_some_and(|r| r > 30.0 && r < 70.0);
    macd_ok || rsi_ok
}

fn trend_rationale(snapshot: &MarketSnapshot, volatility: f64) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "trend".to_string(),
            format!("SMA50={}, SMA200={}", show(snapshot.sma50), show(snapshot.sma200)),
        ),
        (
            "momentum".to_string(),
            format!("MACD={}, RSI={}", show(snapshot.macd), show(snapshot.rsi)),
        ),
        ("volatility".to_string(), format!("{:.2}%", volatility * 100.0)),
    ])
}

fn show(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}
