//! Indicators derived from OHLC closes
//!
//! Used where a provider has no market page of its own.

use crate::error::{Result, SageError};
use crate::model::OhlcSeries;

use super::MarketData;

/// Returns used for the volatility estimate
const VOLATILITY_WINDOW: usize = 30;

/// Simple moving average of the most recent `period` closes
pub fn sma(closes: &[f64], period: usize) -> Result<f64> {
    if period == 0 || closes.len() < period {
        return Err(SageError::InsufficientData {
            required: period.max(1),
            actual: closes.len(),
        });
    }
    let window = &closes[closes.len() - period..];
    Ok(window.iter().sum::<f64>() / period as f64)
}

/// Wilder's relative strength index over `period` changes
pub fn rsi(closes: &[f64], period: usize) -> Result<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Err(SageError::InsufficientData {
            required: period + 1,
            actual: closes.len(),
        });
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, rest) = changes.split_at(period);

    let mut avg_gain = seed.iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss = -seed.iter().filter(|c| **c < 0.0).sum::<f64>() / period as f64;

    for change in rest {
        let (gain, loss) = if *change > 0.0 { (*change, 0.0) } else { (0.0, -change) };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Ok(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Ok(100.0 - 100.0 / (1.0 + rs))
}

/// Standard deviation of close-to-close returns, as a fraction
pub fn volatility(closes: &[f64]) -> Result<f64> {
    if closes.len() < 3 {
        return Err(SageError::InsufficientData {
            required: 3,
            actual: closes.len(),
        });
    }

    let returns: Vec<f64> = closes
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    let recent = &returns[returns.len().saturating_sub(VOLATILITY_WINDOW)..];

    let mean = recent.iter().sum::<f64>() / recent.len() as f64;
    let variance = recent
        .iter()
        .map(|r| {
            let diff = r - mean;
            diff * diff
        })
        .sum::<f64>()
        / recent.len() as f64;

    Ok(variance.sqrt())
}

impl MarketData {
    /// Market page fields computable from candles alone; fields without
    /// enough history stay empty.
    pub fn from_series(series: &OhlcSeries) -> Self {
        let closes = series.closes();
        Self {
            current_price: series.last_close(),
            sma50: sma(&closes, 50).ok(),
            sma200: sma(&closes, 200).ok(),
            rsi_14: rsi(&closes, 14).ok(),
            volatility: volatility(&closes).ok(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Candle;

    #[test]
    fn test_sma_uses_latest_window() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&closes, 2).unwrap(), 4.5);
        assert!(matches!(
            sma(&closes, 6),
            Err(SageError::InsufficientData { required: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&rising, 14).unwrap(), 100.0);

        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        assert!(rsi(&falling, 14).unwrap() < 1e-9);

        let flat = vec![10.0; 20];
        assert_eq!(rsi(&flat, 14).unwrap(), 50.0);
    }

    #[test]
    fn test_volatility_of_constant_returns_is_zero() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        assert!(volatility(&closes).unwrap() < 1e-12);
        assert!(volatility(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_from_series_short_history() {
        let series: OhlcSeries = (0..20)
            .map(|i| {
                let c = 50.0 + i as f64;
                Candle::new(c, c + 1.0, c - 1.0, c)
            })
            .collect::<Vec<_>>()
            .into();

        let market = MarketData::from_series(&series);
        assert_eq!(market.current_price, Some(69.0));
        assert!(market.sma50.is_none());
        assert!(market.rsi_14.is_some());
        assert!(market.volatility.is_some());
    }
}
