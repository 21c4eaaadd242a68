//! Numeric Parsing
//!
//! Tolerant coercions for provider values that arrive as display text
//! ("$ 102,794.00", "3.45%", "-12.40 (Bearish)"). Every function is total:
//! absent or unparseable input yields `None`, never a panic.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

static MONEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?\s*([0-9]+(?:\.[0-9]+)?)").expect("money pattern"));

static SIGNED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([-+]?[0-9]+(?:\.[0-9]+)?)").expect("signed number pattern"));

/// Parse a money amount such as `"$ 102,794"` or `"102,794.00"`.
///
/// Thousands separators are dropped and the first unsigned number is read
/// exactly as a decimal before converting to `f64`.
pub fn parse_money(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }

    match MONEY_RE.captures(&cleaned).and_then(|c| c.get(1)) {
        Some(m) => Decimal::from_str(m.as_str())
            .ok()
            .and_then(|d| d.to_f64())
            .or_else(|| m.as_str().parse::<f64>().ok()),
        None => cleaned.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

/// Parse a percentage into a fraction: `"3.5%"` becomes `0.035`.
pub fn parse_percent(text: &str) -> Option<f64> {
    parse_signed(text).map(|v| v / 100.0)
}

/// First signed number in the text: `"-12.40 (Bearish)"` becomes `-12.4`.
pub fn parse_signed(text: &str) -> Option<f64> {
    SIGNED_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// A reading counts as present when it is finite and non-zero.
pub fn is_present(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

/// First present candidate in fallback order.
///
/// ```
/// use crypto_sage::numeric::first_present;
///
/// assert_eq!(first_present([None, Some(0.0), Some(42.0), Some(7.0)]), Some(42.0));
/// assert_eq!(first_present([None, None]), None);
/// ```
pub fn first_present<I>(candidates: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    candidates.into_iter().flatten().find(|v| is_present(*v))
}

/// Round to `dp` decimal places using the exact binary value of `value`.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Relative distance of `price` from `reference`, as a fraction of `reference`.
pub fn relative_distance(price: f64, reference: f64) -> f64 {
    (reference - price).abs() / reference
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_money_formats() {
        assert_eq!(parse_money("$ 102,794"), Some(102_794.0));
        assert_eq!(parse_money("$102,794.00"), Some(102_794.0));
        assert_eq!(parse_money("102,794"), Some(102_794.0));
        assert!((parse_money("$0.000022").unwrap() - 0.000_022).abs() < 1e-15);
    }

    #[test]
    fn test_parse_money_absent() {
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("   "), None);
        assert_eq!(parse_money("n/a"), None);
    }

    #[test]
    fn test_parse_percent_and_signed() {
        let vol = parse_percent("3.45%").unwrap();
        assert!((vol - 0.0345).abs() < 1e-12);
        assert_eq!(parse_percent("-2 %"), Some(-0.02));
        assert_eq!(parse_signed("-12.40 (Bearish)"), Some(-12.4));
        assert_eq!(parse_signed("52.10 (Neutral)"), Some(52.1));
        assert_eq!(parse_signed("Neutral"), None);
    }

    #[test]
    fn test_first_present_skips_zero_and_missing() {
        assert_eq!(first_present([None, Some(0.0), Some(f64::NAN), Some(3.0)]), Some(3.0));
        assert_eq!(first_present(Vec::<Option<f64>>::new()), None);
    }

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(92.499_96, 3), 92.5);
        assert_eq!(round_dp(107.123_4, 3), 107.123);
        let rounded = Decimal::from_f64_retain(round_dp(0.123_456, 3)).unwrap();
        assert_eq!(rounded.round_dp(3), dec!(0.123));
    }
}
