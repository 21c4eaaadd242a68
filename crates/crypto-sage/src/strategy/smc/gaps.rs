//! Fair Value Gaps
//!
//! Three-candle imbalances where the first and third candle ranges do not
//! overlap.

use serde::{Deserialize, Serialize};

use crate::model::OhlcSeries;
use crate::numeric::relative_distance;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapKind {
    Bull,
    Bear,
}

impl GapKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GapKind::Bull => "bull",
            GapKind::Bear => "bear",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
    pub start_idx: usize,
    /// Always `start_idx + 2`
    pub end_idx: usize,
    pub kind: GapKind,
    /// Lower gap boundary
    pub low: f64,
    /// Upper gap boundary
    pub high: f64,
}

impl FairValueGap {
    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    pub fn width(&self) -> f64 {
        (self.high - self.low).abs()
    }
}

/// Detect every bull and bear gap, ordered by start index.
///
/// - bull: `high[i] < low[i+2]`, zone `[high[i], low[i+2]]`
/// - bear: `low[i] > high[i+2]`, zone `[high[i+2], low[i]]`
pub fn detect_fvgs(series: &OhlcSeries) -> Vec<FairValueGap> {
    let candles = series.candles();

    candles
        .windows(3)
        .enumerate()
        .flat_map(|(i, w)| {
            let (first, third) = (&w[0], &w[2]);
            let bull = (first.high < third.low).then(|| FairValueGap {
                start_idx: i,
                end_idx: i + 2,
                kind: GapKind::Bull,
                low: first.high,
                high: third.low,
            });
            let bear = (first.low > third.high).then(|| FairValueGap {
                start_idx: i,
                end_idx: i + 2,
                kind: GapKind::Bear,
                low: third.high,
                high: first.low,
            });
            bull.into_iter().chain(bear)
        })
        .collect()
}

/// Gap whose midpoint is relatively closest to `price`, if within `max_dist_pct`.
///
/// Returns the gap with its relative distance.
pub fn nearest_gap(
    price: f64,
    gaps: &[FairValueGap],
    max_dist_pct: f64,
) -> Option<(FairValueGap, f64)> {
    gaps.iter()
        .map(|g| (*g, relative_distance(price, g.midpoint())))
        .fold(None, |best: Option<(FairValueGap, f64)>, cand| match best {
            Some(b) if b.1 <= cand.1 => Some(b),
            _ => Some(cand),
        })
        .filter(|(_, dist)| *dist <= max_dist_pct)
}
