//! SMC decision records

use std::fmt;

use serde::{Deserialize, Serialize};

use super::gaps::FairValueGap;
use super::liquidity::LiquidityCluster;
use super::structure::StructureKind;

/// Recommended action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "buy"),
            Action::Sell => write!(f, "sell"),
            Action::Hold => write!(f, "hold"),
        }
    }
}

/// Market-structure bias read from the latest swings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmcBias {
    Bull,
    Bear,
    #[default]
    Neutral,
}

impl fmt::Display for SmcBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmcBias::Bull => write!(f, "bull"),
            SmcBias::Bear => write!(f, "bear"),
            SmcBias::Neutral => write!(f, "neutral"),
        }
    }
}

/// One contribution to the confidence score
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub tag: String,
    pub weight: f64,
}

impl Signal {
    pub fn new(tag: impl Into<String>, weight: f64) -> Self {
        Self {
            tag: tag.into(),
            weight,
        }
    }
}

/// Inputs the score was computed from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionDetails {
    pub bias: SmcBias,
    pub recent_events: Vec<StructureKind>,
    pub nearest_fvg: Option<FairValueGap>,
    pub nearest_fvg_dist: Option<f64>,
    pub nearest_liquidity: Option<LiquidityCluster>,
    pub nearest_liquidity_dist: Option<f64>,
    pub last_close: f64,
    /// Score before clamping
    pub score_raw: f64,
    pub signals: Vec<Signal>,
    pub swings_count: usize,
    pub fvg_count: usize,
    pub liquidity_clusters_count: usize,
}

/// Scored SMC trade decision
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,

    /// Signal tags joined with "; "
    pub reason: String,

    /// Clamped to [0, 1]
    pub confidence: f64,

    /// Rounded to 3 decimals; `None` on hold
    pub entry: Option<f64>,

    /// Rounded to 3 decimals; `None` on hold
    pub stop: Option<f64>,

    /// Empty on hold
    pub targets: Vec<f64>,

    /// Position sizing hint, percent of account
    pub suggested_risk_pct: f64,

    pub details: DecisionDetails,
}

impl Decision {
    pub fn is_actionable(&self) -> bool {
        self.action != Action::Hold
    }
}
