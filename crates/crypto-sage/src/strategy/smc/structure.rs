//! Break of Structure / Change of Character
//!
//! BOS: a close in the recent window beyond the latest swing extreme by more
//! than 0.1%, after that swing formed. CHOCH: the last two highs and last two
//! lows (among the final six swings) both turning the same way.

use serde::{Deserialize, Serialize};

use super::swings::{last_of_kind, SwingKind, SwingPoint};
use crate::model::OhlcSeries;

/// Candles considered "recent" for structure breaks and scoring
pub const RECENT_WINDOW: usize = 30;

/// Swings inspected for a change of character
const CHOCH_LOOKBACK: usize = 6;

const BREAK_MARGIN: f64 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    #[serde(rename = "BOS_high")]
    BosHigh,
    #[serde(rename = "BOS_low")]
    BosLow,
    #[serde(rename = "CHOCH_bull")]
    ChochBull,
    #[serde(rename = "CHOCH_bear")]
    ChochBear,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureEvent {
    pub index: usize,
    pub kind: StructureKind,
    /// Close that triggered the event
    pub price: f64,
    /// Swing the break refers to (BOS only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_index: Option<usize>,
}

/// Direction between the last two values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Leg {
    Up,
    Down,
}

fn last_leg(values: &[f64]) -> Option<Leg> {
    match values {
        [.., prev, last] if last > prev => Some(Leg::Up),
        [.., _, _] => Some(Leg::Down),
        _ => None,
    }
}

/// Detect BOS and CHOCH events, ordered by index.
pub fn detect_structure(series: &OhlcSeries, swings: &[SwingPoint]) -> Vec<StructureEvent> {
    if swings.is_empty() || series.is_empty() {
        return Vec::new();
    }

    let closes = series.closes();
    let n = closes.len();
    let latest_high = last_of_kind(swings, SwingKind::High);
    let latest_low = last_of_kind(swings, SwingKind::Low);

    let mut events = Vec::new();
    let start = n - RECENT_WINDOW.min(n);
    for (i, &close) in closes.iter().enumerate().skip(start) {
        if let Some(high) = latest_high.filter(|h| i > h.index) {
            if close > high.price * (1.0 + BREAK_MARGIN) {
                events.push(StructureEvent {
                    index: i,
                    kind: StructureKind::BosHigh,
                    price: close,
                    ref_index: Some(high.index),
                });
            }
        }
        if let Some(low) = latest_low.filter(|l| i > l.index) {
            if close < low.price * (1.0 - BREAK_MARGIN) {
                events.push(StructureEvent {
                    index: i,
                    kind: StructureKind::BosLow,
                    price: close,
                    ref_index: Some(low.index),
                });
            }
        }
    }

    let mut ordered: Vec<&SwingPoint> = swings.iter().collect();
    ordered.sort_by_key(|s| s.index);
    let tail = &ordered[ordered.len().saturating_sub(CHOCH_LOOKBACK)..];
    let tail_prices = |kind: SwingKind| -> Vec<f64> {
        tail.iter().filter(|s| s.kind == kind).map(|s| s.price).collect()
    };

    let last_close = closes[n - 1];
    match (last_leg(&tail_prices(SwingKind::High)), last_leg(&tail_prices(SwingKind::Low))) {
        (Some(Leg::Down), Some(Leg::Down)) => events.push(StructureEvent {
            index: n - 1,
            kind: StructureKind::ChochBear,
            price: last_close,
            ref_index: None,
        }),
        (Some(Leg::Up), Some(Leg::Up)) => events.push(StructureEvent {
            index: n - 1,
            kind: StructureKind::ChochBull,
            price: last_close,
            ref_index: None,
        }),
        _ => {}
    }

    events.sort_by_key(|e| e.index);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Candle;

    fn series_from_closes(closes: &[f64]) -> OhlcSeries {
        closes
            .iter()
            .map(|c| Candle::new(*c, c + 0.5, c - 0.5, *c))
            .collect::<Vec<_>>()
            .into()
    }

    fn swing(index: usize, kind: SwingKind, price: f64) -> SwingPoint {
        SwingPoint { index, kind, price }
    }

    #[test]
    fn test_bos_high_after_swing() {
        let series = series_from_closes(&[100.0, 101.0, 102.0, 101.0, 100.5, 103.0]);
        let swings = vec![swing(2, SwingKind::High, 102.5)];

        let events = detect_structure(&series, &swings);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, StructureKind::BosHigh);
        assert_eq!(events[0].index, 5);
        assert_eq!(events[0].ref_index, Some(2));
    }

    #[test]
    fn test_break_must_clear_margin() {
        // 102.5 × 1.001 = 102.6025
        let series = series_from_closes(&[100.0, 101.0, 102.0, 102.6]);
        let swings = vec![swing(1, SwingKind::High, 102.5)];
        assert!(detect_structure(&series, &swings).is_empty());
    }

    #[test]
    fn test_bos_low_and_choch_bear() {
        let series = series_from_closes(&[50.0, 49.0, 48.0, 47.0, 46.0, 45.0, 44.0, 42.0]);
        let swings = vec![
            swing(1, SwingKind::High, 52.0),
            swing(2, SwingKind::Low, 47.0),
            swing(3, SwingKind::High, 50.0),
            swing(4, SwingKind::Low, 45.0),
        ];

        let events = detect_structure(&series, &swings);
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![StructureKind::BosLow, StructureKind::BosLow, StructureKind::ChochBear]
        );
        assert_eq!(events.last().unwrap().index, 7);
        assert_eq!(events.last().unwrap().price, 42.0);
    }

    #[test]
    fn test_choch_bull_on_rising_swings() {
        let series = series_from_closes(&[10.0, 11.0, 10.5, 12.0, 11.5, 12.2]);
        let swings = vec![
            swing(0, SwingKind::Low, 9.5),
            swing(1, SwingKind::High, 11.5),
            swing(2, SwingKind::Low, 10.0),
            swing(3, SwingKind::High, 12.5),
        ];

        let events = detect_structure(&series, &swings);
        assert!(events.iter().any(|e| e.kind == StructureKind::ChochBull));
    }

    #[test]
    fn test_mixed_swings_have_no_choch() {
        let series = series_from_closes(&[10.0, 11.0, 10.5, 10.8]);
        let swings = vec![
            swing(0, SwingKind::High, 11.5),
            swing(1, SwingKind::Low, 9.0),
            swing(2, SwingKind::High, 11.0),
            swing(3, SwingKind::Low, 9.5),
        ];
        assert!(detect_structure(&series, &swings)
            .iter()
            .all(|e| !matches!(e.kind, StructureKind::ChochBull | StructureKind::ChochBear)));
    }

    #[test]
    fn test_no_swings_no_events() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        assert!(detect_structure(&series, &[]).is_empty());
    }
}
