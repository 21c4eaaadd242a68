//! Liquidity Clusters
//!
//! Groups of swing prices lying close together, presumed to hold resting
//! orders.

use serde::{Deserialize, Serialize};

use super::swings::{SwingKind, SwingPoint};
use crate::numeric::relative_distance;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiquidityCluster {
    pub mean_price: f64,
    /// Member count
    pub size: usize,
    /// Series indices of the member swings
    pub members: Vec<usize>,
    pub kinds: Vec<SwingKind>,
}

impl LiquidityCluster {
    pub fn high_count(&self) -> usize {
        self.kinds.iter().filter(|k| **k == SwingKind::High).count()
    }

    pub fn low_count(&self) -> usize {
        self.kinds.iter().filter(|k| **k == SwingKind::Low).count()
    }

    /// Kind holding the strict majority, if any
    pub fn dominant_kind(&self) -> Option<SwingKind> {
        let (highs, lows) = (self.high_count(), self.low_count());
        match highs.cmp(&lows) {
            std::cmp::Ordering::Greater => Some(SwingKind::High),
            std::cmp::Ordering::Less => Some(SwingKind::Low),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Greedily cluster swings within `range_pct` of each seed price.
///
/// Swings are visited in the order given. Each unclaimed swing seeds a cluster
/// and pulls in every later unclaimed swing whose price lies within
/// `range_pct` of the seed. Result is sorted by size, largest first; equal
/// sizes keep seed order.
pub fn cluster_liquidity(swings: &[SwingPoint], range_pct: f64) -> Vec<LiquidityCluster> {
    let mut claimed = vec![false; swings.len()];
    let mut clusters = Vec::new();

    for (i, seed) in swings.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;
        let mut members = vec![seed];

        for (j, other) in swings.iter().enumerate().skip(i + 1) {
            if !claimed[j] && (other.price - seed.price).abs() / seed.price <= range_pct {
                claimed[j] = true;
                members.push(other);
            }
        }

        let total: f64 = members.iter().map(|m| m.price).sum();
        clusters.push(LiquidityCluster {
            mean_price: total / members.len() as f64,
            size: members.len(),
            members: members.iter().map(|m| m.index).collect(),
            kinds: members.iter().map(|m| m.kind).collect(),
        });
    }

    clusters.sort_by(|a, b| b.size.cmp(&a.size));
    clusters
}

/// Cluster whose mean price is relatively closest to `price`, if within
/// `max_dist_pct`.
pub fn nearest_cluster(
    price: f64,
    clusters: &[LiquidityCluster],
    max_dist_pct: f64,
) -> Option<(&LiquidityCluster, f64)> {
    clusters
        .iter()
        .map(|c| (c, relative_distance(price, c.mean_price)))
        .fold(None, |best: Option<(&LiquidityCluster, f64)>, cand| match best {
            Some(b) if b.1 <= cand.1 => Some(b),
            _ => Some(cand),
        })
        .filter(|(_, dist)| *dist <= max_dist_pct)
}
