//! Signal scoring and trade planning
//!
//! The confidence score is a fold over explicit [`Signal`] contributions
//! starting from 0.5, so the rationale trail and the score never drift apart.

use super::decision::{Action, SmcBias, Signal};
use super::gaps::{FairValueGap, GapKind};
use super::liquidity::LiquidityCluster;
use super::structure::StructureKind;
use super::swings::{last_of_kind, prices_of_kind, SwingKind, SwingPoint};
use crate::numeric::relative_distance;

pub const BASE_SCORE: f64 = 0.5;
pub const BUY_THRESHOLD: f64 = 0.62;
pub const SELL_THRESHOLD: f64 = 0.38;

/// Swings required before bias can leave neutral
const MIN_BIAS_SWINGS: usize = 4;

/// Relative distance to the last swing counted as "near"
const SWING_PROXIMITY: f64 = 0.015;

/// Stop room beyond a gap, as a fraction of gap width
const GAP_STOP_RATIO: f64 = 0.6;

const GAP_TARGET_MULTIPLES: [f64; 2] = [1.5, 3.0];
const SWING_TARGET_MULTIPLES: [f64; 2] = [1.2, 2.0];
const FALLBACK_STOP_PCT: f64 = 0.02;
const FALLBACK_TARGET_PCTS: [f64; 2] = [0.02, 0.04];
const STOP_EPSILON: f64 = 1e-9;

/// Compare the last two swing highs and lows.
///
/// Both rising is bull, both falling is bear. Mixed legs, fewer than four
/// swings, or fewer than two of either kind stay neutral.
pub fn classify_bias(swings: &[SwingPoint]) -> SmcBias {
    if swings.len() < MIN_BIAS_SWINGS {
        return SmcBias::Neutral;
    }

    let mut ordered = swings.to_vec();
    ordered.sort_by_key(|s| s.index);
    let highs = prices_of_kind(&ordered, SwingKind::High);
    let lows = prices_of_kind(&ordered, SwingKind::Low);

    match (highs.as_slice(), lows.as_slice()) {
        ([.., h1, h2], [.., l1, l2]) if h2 > h1 && l2 > l1 => SmcBias::Bull,
        ([.., h1, h2], [.., l1, l2]) if h2 < h1 && l2 < l1 => SmcBias::Bear,
        _ => SmcBias::Neutral,
    }
}

/// Everything the score depends on
#[derive(Clone, Copy, Debug)]
pub struct ScoreInputs<'a> {
    pub bias: SmcBias,
    pub recent_events: &'a [StructureKind],
    pub nearest_gap: Option<(FairValueGap, f64)>,
    pub nearest_liquidity: Option<(&'a LiquidityCluster, f64)>,
    pub last_swing: Option<&'a SwingPoint>,
    pub last_close: f64,
}

impl ScoreInputs<'_> {
    fn has_event(&self, kind: StructureKind) -> bool {
        self.recent_events.contains(&kind)
    }
}

/// Collect signal contributions in rationale order.
pub fn collect_signals(inputs: &ScoreInputs<'_>) -> Vec<Signal> {
    let bias = inputs.bias;
    let mut signals = vec![match bias {
        SmcBias::Bull => Signal::new("structure_bullish", 0.15),
        SmcBias::Bear => Signal::new("structure_bearish", -0.15),
        SmcBias::Neutral => Signal::new("structure_neutral", 0.0),
    }];

    let structure = [
        (StructureKind::ChochBull, "recent_CHOCH_bull", 0.25),
        (StructureKind::ChochBear, "recent_CHOCH_bear", -0.25),
        (StructureKind::BosHigh, "recent_BOS_bull", 0.12),
        (StructureKind::BosLow, "recent_BOS_bear", -0.12),
    ];
    signals.extend(
        structure
            .iter()
            .filter(|(kind, _, _)| inputs.has_event(*kind))
            .map(|(_, tag, weight)| Signal::new(*tag, *weight)),
    );

    if let Some((gap, dist)) = inputs.nearest_gap {
        let aligned = matches!(
            (gap.kind, bias),
            (GapKind::Bull, SmcBias::Bull) | (GapKind::Bear, SmcBias::Bear) | (_, SmcBias::Neutral)
        );
        if aligned {
            signals.push(Signal::new(
                format!("near_fvg_{}", gap.kind.as_str()),
                (0.12 - dist).max(0.08),
            ));
        } else {
            signals.push(Signal::new(
                format!("near_fvg_misaligned_{}", gap.kind.as_str()),
                -0.05,
            ));
        }
    }

    if let Some((cluster, _)) = inputs.nearest_liquidity {
        match (cluster.dominant_kind(), bias) {
            (Some(SwingKind::High), SmcBias::Bull) => {
                signals.push(Signal::new("overhead_liquidity_nearby", -0.08));
            }
            (Some(SwingKind::High), _) => {
                signals.push(Signal::new("overhead_liquidity_target", 0.03));
            }
            (Some(SwingKind::Low), SmcBias::Bear) => {
                signals.push(Signal::new("support_liquidity_nearby_bear", 0.03));
            }
            (Some(SwingKind::Low), _) => {
                signals.push(Signal::new("support_liquidity_nearby", 0.05));
            }
            (None, _) => {}
        }
    }

    if let Some(swing) = inputs.last_swing {
        if relative_distance(inputs.last_close, swing.price) <= SWING_PROXIMITY {
            let consistent = matches!(
                (swing.kind, bias),
                (SwingKind::Low, SmcBias::Bull) | (SwingKind::High, SmcBias::Bear)
            );
            let weight = if consistent { 0.03 } else { -0.03 };
            signals.push(Signal::new("price_near_last_swing", weight));
        }
    }

    signals
}

/// Unclamped score: the base plus every signal weight
pub fn raw_score(signals: &[Signal]) -> f64 {
    signals.iter().fold(BASE_SCORE, |score, s| score + s.weight)
}

/// Map a clamped confidence to an action.
///
/// Above the buy threshold a bearish bias still sells unless a bullish CHOCH
/// is recent; below the sell threshold a bullish bias still buys unless a
/// bearish CHOCH is recent.
pub fn choose_action(confidence: f64, bias: SmcBias, recent_events: &[StructureKind]) -> Action {
    if confidence >= BUY_THRESHOLD {
        if bias != SmcBias::Bear || recent_events.contains(&StructureKind::ChochBull) {
            Action::Buy
        } else {
            Action::Sell
        }
    } else if confidence <= SELL_THRESHOLD {
        if bias != SmcBias::Bull || recent_events.contains(&StructureKind::ChochBear) {
            Action::Sell
        } else {
            Action::Buy
        }
    } else {
        Action::Hold
    }
}

/// Entry, stop and targets for an actionable decision
#[derive(Clone, Debug, PartialEq)]
pub struct TradePlan {
    pub entry: f64,
    pub stop: f64,
    pub targets: Vec<f64>,
}

impl TradePlan {
    fn from_risk(entry: f64, stop: f64, multiples: [f64; 2]) -> Self {
        let risk = entry - stop;
        Self {
            entry,
            stop,
            targets: multiples.iter().map(|m| entry + risk * m).collect(),
        }
    }
}

/// Build the trade plan for `action`; `None` for hold.
///
/// Prefers a nearby gap of the trade's kind, then the latest swing on the
/// protective side, then fixed 2%/4% levels around the close.
pub fn plan_trade(
    action: Action,
    nearest_gap: Option<&FairValueGap>,
    swings: &[SwingPoint],
    last_close: f64,
) -> Option<TradePlan> {
    match action {
        Action::Hold => None,
        Action::Buy => Some(match nearest_gap.filter(|g| g.kind == GapKind::Bull) {
            Some(gap) => TradePlan::from_risk(
                gap.low.max(last_close),
                gap.low - gap.width() * GAP_STOP_RATIO,
                GAP_TARGET_MULTIPLES,
            ),
            None => match last_of_kind(swings, SwingKind::Low) {
                Some(low) => {
                    let entry = low.price.max(last_close);
                    let stop = low.price - ((entry - low.price).abs() * GAP_STOP_RATIO + STOP_EPSILON);
                    TradePlan::from_risk(entry, stop, SWING_TARGET_MULTIPLES)
                }
                None => TradePlan {
                    entry: last_close,
                    stop: last_close * (1.0 - FALLBACK_STOP_PCT),
                    targets: FALLBACK_TARGET_PCTS.iter().map(|p| last_close * (1.0 + p)).collect(),
                },
            },
        }),
        Action::Sell => Some(match nearest_gap.filter(|g| g.kind == GapKind::Bear) {
            Some(gap) => TradePlan::from_risk(
                gap.high.min(last_close),
                gap.high + gap.width() * GAP_STOP_RATIO,
                GAP_TARGET_MULTIPLES,
            ),
            None => match last_of_kind(swings, SwingKind::High) {
                Some(high) => {
                    let entry = high.price.min(last_close);
                    let stop = high.price + ((entry - high.price).abs() * GAP_STOP_RATIO + STOP_EPSILON);
                    TradePlan::from_risk(entry, stop, SWING_TARGET_MULTIPLES)
                }
                None => TradePlan {
                    entry: last_close,
                    stop: last_close * (1.0 + FALLBACK_STOP_PCT),
                    targets: FALLBACK_TARGET_PCTS.iter().map(|p| last_close * (1.0 - p)).collect(),
                },
            },
        }),
    }
}
