//! Swing Detection
//!
//! A bar is a swing high when its high is the maximum of the closed window
//! `[i - L, i + L]`, and a swing low when its low is the window minimum.
//! Bars within `L` of either end of the series are never marked.

use serde::{Deserialize, Serialize};

use crate::model::OhlcSeries;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed swing extreme
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    /// Index into the series
    pub index: usize,
    pub kind: SwingKind,
    pub price: f64,
}

/// Detect swing highs and lows, ordered by index (high before low on the
/// same bar).
pub fn detect_swings(series: &OhlcSeries, swing_length: usize) -> Vec<SwingPoint> {
    let highs = series.highs();
    let lows = series.lows();
    let n = highs.len();
    let len = swing_length;

    // Full window of 2L + 1 bars, checked without overflow
    if len >= n || n - len <= len {
        return Vec::new();
    }

    let mut swings = Vec::new();
    for i in len..n - len {
        let window = i - len..=i + len;
        let window_high = highs[window.clone()].iter().copied().fold(f64::MIN, f64::max);
        let window_low = lows[window].iter().copied().fold(f64::MAX, f64::min);

        if highs[i] == window_high {
            swings.push(SwingPoint {
                index: i,
                kind: SwingKind::High,
                price: highs[i],
            });
        }
        if lows[i] == window_low {
            swings.push(SwingPoint {
                index: i,
                kind: SwingKind::Low,
                price: lows[i],
            });
        }
    }

    swings
}

/// Most recent swing of the given kind
pub fn last_of_kind(swings: &[SwingPoint], kind: SwingKind) -> Option<&SwingPoint> {
    swings
        .iter()
        .filter(|s| s.kind == kind)
        .max_by_key(|s| s.index)
}

/// Prices of the swings of one kind, in index order
pub fn prices_of_kind(swings: &[SwingPoint], kind: SwingKind) -> Vec<f64> {
    swings
        .iter()
        .filter(|s| s.kind == kind)
        .map(|s| s.price)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Candle;

    fn series_from_highs(highs: &[f64]) -> OhlcSeries {
        highs
            .iter()
            .map(|h| Candle::new(h - 0.5, *h, h - 1.0, h - 0.5))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_single_peak_and_troughs() {
        let series = series_from_highs(&[1.0, 2.0, 3.0, 5.0, 3.0, 2.0, 1.0]);
        let swings = detect_swings(&series, 2);

        let highs: Vec<_> = swings.iter().filter(|s| s.kind == SwingKind::High).collect();
        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].index, 3);
        assert_eq!(highs[0].price, 5.0);
    }

    #[test]
    fn test_boundaries_never_marked() {
        let highs: Vec<f64> = (0..40)
            .map(|i| 100.0 + ((i * 7) % 11) as f64 - ((i * 3) % 5) as f64)
            .collect();
        let series = series_from_highs(&highs);

        for len in 1..6 {
            for swing in detect_swings(&series, len) {
                assert!(swing.index >= len);
                assert!(swing.index < highs.len() - len);
            }
        }
    }

    #[test]
    fn test_flat_series_marks_both_kinds() {
        let series = series_from_highs(&[10.0; 7]);
        let swings = detect_swings(&series, 1);

        // Every interior bar ties the window max and min
        assert_eq!(swings.len(), 10);
        assert_eq!(swings[0].kind, SwingKind::High);
        assert_eq!(swings[1].kind, SwingKind::Low);
        assert_eq!(swings[0].index, swings[1].index);
    }

    #[test]
    fn test_short_series_has_no_swings() {
        let series = series_from_highs(&[1.0, 2.0, 3.0, 2.0]);
        assert!(detect_swings(&series, 2).is_empty());
        assert!(detect_swings(&OhlcSeries::default(), 10).is_empty());
    }

    #[test]
    fn test_huge_swing_length_is_empty() {
        let series = series_from_highs(&[1.0, 2.0, 3.0, 5.0, 3.0, 2.0, 1.0]);
        assert!(detect_swings(&series, usize::MAX).is_empty());
        assert!(detect_swings(&series, usize::MAX / 2).is_empty());
        assert_eq!(detect_swings(&series, 3).len(), 1);
    }
}
