//! Smart Money Concepts Analyzer
//!
//! Reads an OHLC series for swing structure, fair value gaps, structure
//! breaks and liquidity pools, then folds them into one scored decision.
//!
//! ```text
//!   swings ─┬─► structure ─┐
//!           ├─► liquidity ─┼─► signals ─► confidence ─► action ─► plan
//!   gaps ───┴──────────────┘
//! ```

mod decision;
mod gaps;
mod liquidity;
mod scoring;
mod structure;
mod swings;

pub use decision::{Action, Decision, DecisionDetails, Signal, SmcBias};
pub use gaps::{detect_fvgs, nearest_gap, FairValueGap, GapKind};
pub use liquidity::{cluster_liquidity, nearest_cluster, LiquidityCluster};
pub use scoring::{BUY_THRESHOLD, SELL_THRESHOLD};
pub use structure::{detect_structure, StructureEvent, StructureKind, RECENT_WINDOW};
pub use swings::{detect_swings, SwingKind, SwingPoint};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SageError};
use crate::model::OhlcSeries;
use crate::numeric::round_dp;
use scoring::{choose_action, classify_bias, collect_signals, plan_trade, raw_score, ScoreInputs};

/// Liquidity nearness is judged at this multiple of the clustering tolerance
const LIQUIDITY_NEAR_FACTOR: f64 = 3.0;

/// Minimum position-sizing hint
const MIN_RISK_PCT: f64 = 0.25;
const RISK_PCT_PER_CONFIDENCE: f64 = 1.5;

/// Largest accepted `swing_length`
pub const MAX_SWING_LENGTH: usize = 1_000;

/// Analyzer configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmcConfig {
    /// Bars on each side a swing must dominate
    pub swing_length: usize,

    /// Maximum relative distance for a gap to count as near
    pub fvg_max_dist_pct: f64,

    /// Clustering tolerance; nearness uses 3× this value
    pub liq_range_pct: f64,
}

impl Default for SmcConfig {
    fn default() -> Self {
        Self {
            swing_length: 10,
            fvg_max_dist_pct: 0.03,
            liq_range_pct: 0.01,
        }
    }
}

impl SmcConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            swing_length: env_parse("SMC_SWING_LENGTH").unwrap_or(defaults.swing_length),
            fvg_max_dist_pct: env_parse("SMC_FVG_MAX_DIST_PCT").unwrap_or(defaults.fvg_max_dist_pct),
            liq_range_pct: env_parse("SMC_LIQ_RANGE_PCT").unwrap_or(defaults.liq_range_pct),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.swing_length == 0 {
            return Err(SageError::Config("swing_length must be at least 1".into()));
        }
        if self.swing_length > MAX_SWING_LENGTH {
            return Err(SageError::Config(format!(
                "swing_length must be at most {}, got {}",
                MAX_SWING_LENGTH, self.swing_length
            )));
        }
        for (name, value) in [
            ("fvg_max_dist_pct", self.fvg_max_dist_pct),
            ("liq_range_pct", self.liq_range_pct),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SageError::Config(format!(
                    "{} must be a positive fraction, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Pattern stages supplied by the caller instead of being detected
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecomputedPatterns {
    pub swings: Option<Vec<SwingPoint>>,
    pub gaps: Option<Vec<FairValueGap>>,
    pub structure: Option<Vec<StructureEvent>>,
    pub liquidity: Option<Vec<LiquidityCluster>>,
}

/// Smart Money Concepts trade analyzer
#[derive(Clone, Debug, Default)]
pub struct SmcAnalyzer {
    config: SmcConfig,
}

impl SmcAnalyzer {
    pub fn new(config: SmcConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SmcConfig {
        &self.config
    }

    /// Detect every pattern from the series and score a decision.
    pub fn analyze_trade(&self, series: &OhlcSeries) -> Result<Decision> {
        self.analyze_with(series, PrecomputedPatterns::default())
    }

    /// Score a decision, using any supplied stage in place of detection.
    ///
    /// Fails only for an empty series. Series too short for swings simply
    /// yield empty detectors and a neutral hold.
    pub fn analyze_with(&self, series: &OhlcSeries, patterns: PrecomputedPatterns) -> Result<Decision> {
        let last_close = series
            .last_close()
            .ok_or(SageError::InsufficientData { required: 1, actual: 0 })?;
        let cfg = &self.config;

        let swings = patterns
            .swings
            .unwrap_or_else(|| detect_swings(series, cfg.swing_length));
        let gaps = patterns.gaps.unwrap_or_else(|| detect_fvgs(series));
        let events = patterns
            .structure
            .unwrap_or_else(|| detect_structure(series, &swings));
        let clusters = patterns
            .liquidity
            .unwrap_or_else(|| cluster_liquidity(&swings, cfg.liq_range_pct));

        debug!(
            candles = series.len(),
            swings = swings.len(),
            gaps = gaps.len(),
            events = events.len(),
            clusters = clusters.len(),
            "smc patterns ready"
        );

        let bias = classify_bias(&swings);
        let threshold = series.len().saturating_sub(RECENT_WINDOW);
        let recent_events: Vec<StructureKind> = events
            .iter()
            .filter(|e| e.index >= threshold)
            .map(|e| e.kind)
            .collect();

        let near_gap = nearest_gap(last_close, &gaps, cfg.fvg_max_dist_pct);
        let near_liquidity = nearest_cluster(
            last_close,
            &clusters,
            cfg.liq_range_pct * LIQUIDITY_NEAR_FACTOR,
        );
        let last_swing = swings.iter().max_by_key(|s| s.index);

        let signals = collect_signals(&ScoreInputs {
            bias,
            recent_events: &recent_events,
            nearest_gap: near_gap,
            nearest_liquidity: near_liquidity,
            last_swing,
            last_close,
        });
        let score_raw = raw_score(&signals);
        let confidence = score_raw.clamp(0.0, 1.0);
        let action = choose_action(confidence, bias, &recent_events);
        let plan = plan_trade(action, near_gap.as_ref().map(|(g, _)| g), &swings, last_close);

        debug!(%bias, %action, confidence, "smc decision scored");

        let reason = signals
            .iter()
            .map(|s| s.tag.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        Ok(Decision {
            action,
            reason,
            confidence,
            entry: plan.as_ref().map(|p| round_dp(p.entry, 3)),
            stop: plan.as_ref().map(|p| round_dp(p.stop, 3)),
            targets: plan.map(|p| p.targets).unwrap_or_default(),
            suggested_risk_pct: MIN_RISK_PCT.max(RISK_PCT_PER_CONFIDENCE * confidence),
            details: DecisionDetails {
                bias,
                recent_events,
                nearest_fvg: near_gap.map(|(g, _)| g),
                nearest_fvg_dist: near_gap.map(|(_, d)| d),
                nearest_liquidity: near_liquidity.map(|(c, _)| c.clone()),
                nearest_liquidity_dist: near_liquidity.map(|(_, d)| d),
                last_close,
                score_raw,
                signals,
                swings_count: swings.len(),
                fvg_count: gaps.len(),
                liquidity_clusters_count: clusters.len(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Candle;

    /// Rising zigzag: swing highs at 4, 12, 20 and swing lows at 8, 16
    /// with swing_length 3.
    fn rising_zigzag() -> OhlcSeries {
        const WAVE: [f64; 8] = [-4.0, -2.0, 0.0, 2.0, 4.0, 2.0, 0.0, -2.0];
        (0..25)
            .map(|i| {
                let high = 100.0 + 0.5 * i as f64 + WAVE[i % 8];
                Candle::new(high - 0.5, high, high - 1.0, high - 0.5)
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn flat(n: usize, price: f64) -> OhlcSeries {
        vec![Candle::new(price, price, price, price); n].into()
    }

    fn analyzer(swing_length: usize) -> SmcAnalyzer {
        SmcAnalyzer::new(SmcConfig {
            swing_length,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_uptrend_scores_bullish_buy() {
        let decision = analyzer(3).analyze_trade(&rising_zigzag()).unwrap();

        assert_eq!(decision.details.bias, SmcBias::Bull);
        assert_eq!(decision.details.swings_count, 5);
        assert!(decision.details.recent_events.contains(&StructureKind::ChochBull));
        assert!(decision.confidence > 0.5);
        // bull +0.15, CHOCH +0.25, misaligned bear gap -0.05, overhead highs -0.08
        assert!((decision.confidence - 0.77).abs() < 1e-9);
        assert_eq!(decision.action, Action::Buy);

        // No bull gap nearby: entry from the last swing low at 103
        assert_eq!(decision.entry, Some(107.5));
        assert!((decision.stop.unwrap() - 100.3).abs() < 1e-9);
        assert_eq!(decision.targets.len(), 2);
        assert!(decision.targets[0] > 107.5 && decision.targets[1] > decision.targets[0]);
        assert!(decision.reason.starts_with("structure_bullish; recent_CHOCH_bull"));
        assert!((decision.suggested_risk_pct - 1.155).abs() < 1e-9);
    }

    #[test]
    fn test_short_series_holds() {
        let decision = SmcAnalyzer::default().analyze_trade(&flat(5, 42.0)).unwrap();

        assert_eq!(decision.action, Action::Hold);
        assert_eq!(decision.details.bias, SmcBias::Neutral);
        assert_eq!(decision.confidence, 0.5);
        assert_eq!(decision.reason, "structure_neutral");
        assert!(decision.entry.is_none());
        assert!(decision.stop.is_none());
        assert!(decision.targets.is_empty());
        assert_eq!(decision.suggested_risk_pct, 0.75);
    }

    #[test]
    fn test_empty_series_is_an_error() {
        let err = SmcAnalyzer::default()
            .analyze_trade(&OhlcSeries::default())
            .unwrap_err();
        assert!(matches!(err, SageError::InsufficientData { required: 1, actual: 0 }));
    }

    #[test]
    fn test_precomputed_structure_overrides_detection() {
        let series = flat(5, 50.0);
        let patterns = PrecomputedPatterns {
            structure: Some(vec![StructureEvent {
                index: 4,
                kind: StructureKind::ChochBear,
                price: 50.0,
                ref_index: None,
            }]),
            ..Default::default()
        };

        let decision = SmcAnalyzer::default().analyze_with(&series, patterns).unwrap();
        assert_eq!(decision.action, Action::Sell);
        assert!((decision.confidence - 0.25).abs() < 1e-9);
        assert_eq!(decision.entry, Some(50.0));
        assert!((decision.stop.unwrap() - 51.0).abs() < 1e-9);
        assert_eq!(decision.targets.len(), 2);
    }

    #[test]
    fn test_config_validation() {
        assert!(SmcConfig::default().validate().is_ok());
        assert!(SmcAnalyzer::new(SmcConfig {
            swing_length: 0,
            ..Default::default()
        })
        .is_err());
        assert!(SmcAnalyzer::new(SmcConfig {
            liq_range_pct: f64::NAN,
            ..Default::default()
        })
        .is_err());
        assert!(SmcAnalyzer::new(SmcConfig {
            swing_length: MAX_SWING_LENGTH,
            ..Default::default()
        })
        .is_ok());
        assert!(SmcAnalyzer::new(SmcConfig {
            swing_length: usize::MAX,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_max_swing_length_on_short_series_holds() {
        let analyzer = SmcAnalyzer::new(SmcConfig {
            swing_length: MAX_SWING_LENGTH,
            ..Default::default()
        })
        .unwrap();

        let decision = analyzer.analyze_trade(&flat(30, 10.0)).unwrap();
        assert_eq!(decision.action, Action::Hold);
        assert_eq!(decision.details.swings_count, 0);
    }

    #[test]
    fn test_decision_serializes_action_lowercase() {
        let decision = SmcAnalyzer::default().analyze_trade(&flat(3, 10.0)).unwrap();
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["action"], "hold");
        assert_eq!(json["details"]["bias"], "neutral");
    }
}
