//! Technical Indicator Sheets
//!
//! Scanner readings arrive keyed by field code (`RSI|240`, `MACD.macd`) with
//! raw numeric values. They are relabelled and rendered into the display
//! text the narrator reads, in a fixed field order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Interval;
use crate::numeric::{parse_money, parse_percent, parse_signed};

/// Scanner fields requested per symbol, with their display labels
pub const TECHNICAL_FIELDS: &[(&str, &str)] = &[
    ("Recommend.Other", "Other Recommendations"),
    ("Recommend.All", "Overall Recommendation"),
    ("Recommend.MA", "Moving Average Recommendation"),
    ("RSI", "Relative Strength Index (RSI)"),
    ("RSI[1]", "RSI (Previous)"),
    ("Stoch.K", "Stochastic %K"),
    ("Stoch.D", "Stochastic %D"),
    ("Stoch.K[1]", "Stochastic %K (Previous)"),
    ("Stoch.D[1]", "Stochastic %D (Previous)"),
    ("CCI20", "Commodity Channel Index (CCI 20)"),
    ("CCI20[1]", "CCI 20 (Previous)"),
    ("ADX", "Average Directional Index (ADX)"),
    ("ADX+DI", "ADX Positive Directional Indicator (+DI)"),
    ("ADX-DI", "ADX Negative Directional Indicator (-DI)"),
    ("ADX+DI[1]", "ADX +DI (Previous)"),
    ("ADX-DI[1]", "ADX -DI (Previous)"),
    ("AO", "Awesome Oscillator (AO)"),
    ("AO[1]", "Awesome Oscillator (Previous)"),
    ("AO[2]", "Awesome Oscillator (2 Bars Ago)"),
    ("Mom", "Momentum"),
    ("Mom[1]", "Momentum (Previous)"),
    ("MACD.macd", "MACD Line"),
    ("MACD.signal", "MACD Signal Line"),
    ("Rec.Stoch.RSI", "Stochastic RSI Recommendation"),
    ("Stoch.RSI.K", "Stochastic RSI %K"),
    ("Rec.WR", "Williams %R Recommendation"),
    ("W.R", "Williams %R"),
    ("Rec.BBPower", "Bollinger Band Power Recommendation"),
    ("BBPower", "Bollinger Band Power"),
    ("Rec.UO", "Ultimate Oscillator Recommendation"),
    ("UO", "Ultimate Oscillator"),
    ("EMA10", "Exponential Moving Average (10)"),
    ("close", "Closing Price"),
    ("SMA10", "Simple Moving Average (10)"),
    ("EMA20", "Exponential Moving Average (20)"),
    ("SMA20", "Simple Moving Average (20)"),
    ("EMA30", "Exponential Moving Average (30)"),
    ("SMA30", "Simple Moving Average (30)"),
    ("EMA50", "Exponential Moving Average (50)"),
    ("SMA50", "Simple Moving Average (50)"),
    ("EMA100", "Exponential Moving Average (100)"),
    ("SMA100", "Simple Moving Average (100)"),
    ("EMA200", "Exponential Moving Average (200)"),
    ("SMA200", "Simple Moving Average (200)"),
    ("Rec.Ichimoku", "Ichimoku Cloud Recommendation"),
    ("Ichimoku.BLine", "Ichimoku Base Line"),
    ("Rec.VWMA", "VWMA Recommendation"),
    ("VWMA", "Volume Weighted Moving Average (VWMA)"),
    ("Rec.HullMA9", "Hull Moving Average (9) Recommendation"),
    ("HullMA9", "Hull Moving Average (9)"),
    ("Pivot.M.Classic.R3", "Pivot Point Classic R3"),
    ("Pivot.M.Classic.R2", "Pivot Point Classic R2"),
    ("Pivot.M.Classic.R1", "Pivot Point Classic R1"),
    ("Pivot.M.Classic.Middle", "Pivot Point Classic Middle"),
    ("Pivot.M.Classic.S1", "Pivot Point Classic S1"),
    ("Pivot.M.Classic.S2", "Pivot Point Classic S2"),
    ("Pivot.M.Classic.S3", "Pivot Point Classic S3"),
    ("Pivot.M.Fibonacci.R3", "Pivot Point Fibonacci R3"),
    ("Pivot.M.Fibonacci.R2", "Pivot Point Fibonacci R2"),
    ("Pivot.M.Fibonacci.R1", "Pivot Point Fibonacci R1"),
    ("Pivot.M.Fibonacci.Middle", "Pivot Point Fibonacci Middle"),
    ("Pivot.M.Fibonacci.S1", "Pivot Point Fibonacci S1"),
    ("Pivot.M.Fibonacci.S2", "Pivot Point Fibonacci S2"),
    ("Pivot.M.Fibonacci.S3", "Pivot Point Fibonacci S3"),
    ("Pivot.M.Camarilla.R3", "Pivot Point Camarilla R3"),
    ("Pivot.M.Camarilla.R2", "Pivot Point Camarilla R2"),
    ("Pivot.M.Camarilla.R1", "Pivot Point Camarilla R1"),
    ("Pivot.M.Camarilla.Middle", "Pivot Point Camarilla Middle"),
    ("Pivot.M.Camarilla.S1", "Pivot Point Camarilla S1"),
    ("Pivot.M.Camarilla.S2", "Pivot Point Camarilla S2"),
    ("Pivot.M.Camarilla.S3", "Pivot Point Camarilla S3"),
    ("Pivot.M.Woodie.R3", "Pivot Point Woodie R3"),
    ("Pivot.M.Woodie.R2", "Pivot Point Woodie R2"),
    ("Pivot.M.Woodie.R1", "Pivot Point Woodie R1"),
    ("Pivot.M.Woodie.Middle", "Pivot Point Woodie Middle"),
    ("Pivot.M.Woodie.S1", "Pivot Point Woodie S1"),
    ("Pivot.M.Woodie.S2", "Pivot Point Woodie S2"),
    ("Pivot.M.Woodie.S3", "Pivot Point Woodie S3"),
    ("Pivot.M.Demark.R1", "Pivot Point Demark R1"),
    ("Pivot.M.Demark.Middle", "Pivot Point Demark Middle"),
    ("Pivot.M.Demark.S1", "Pivot Point Demark S1"),
];

/// Name fragments of fields quoted in dollars
const PRICE_WORDS: &[&str] = &[
    "price", "close", "open", "high", "low", "target", "sma", "ema", "bb.upper", "bb.lower",
    "pivot", "ichimoku", "hull", "vwma", "bbpower",
];

/// Scanner field codes with the interval suffix applied
pub fn field_codes(interval: Interval) -> Vec<String> {
    TECHNICAL_FIELDS
        .iter()
        .map(|(code, _)| match interval.field_suffix() {
            Some(suffix) => format!("{}|{}", code, suffix),
            None => (*code).to_string(),
        })
        .collect()
}

/// A reading: raw number or rendered text
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Number(f64),
    Text(String),
}

impl IndicatorValue {
    /// Read as a dollar amount ("$1,234.56")
    pub fn money(&self) -> Option<f64> {
        match self {
            IndicatorValue::Number(n) => Some(*n).filter(|v| v.is_finite()),
            IndicatorValue::Text(t) => parse_money(t),
        }
    }

    /// Read as a signed number ("-12.40 (Bearish)")
    pub fn signed(&self) -> Option<f64> {
        match self {
            IndicatorValue::Number(n) => Some(*n).filter(|v| v.is_finite()),
            IndicatorValue::Text(t) => parse_signed(t),
        }
    }

    /// Read a percentage reading as a fraction ("3.5%" or 3.5 both give 0.035)
    pub fn percent(&self) -> Option<f64> {
        match self {
            IndicatorValue::Number(n) => Some(*n / 100.0).filter(|v| v.is_finite()),
            IndicatorValue::Text(t) => parse_percent(t),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorEntry {
    /// Scanner field code without interval suffix
    pub field: String,
    pub label: String,
    pub value: IndicatorValue,
}

/// Ordered indicator readings for one symbol
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSheet {
    entries: Vec<IndicatorEntry>,
}

impl IndicatorSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        field: impl Into<String>,
        label: impl Into<String>,
        value: IndicatorValue,
    ) {
        self.entries.push(IndicatorEntry {
            field: field.into(),
            label: label.into(),
            value,
        });
    }

    pub fn entries(&self) -> &[IndicatorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose field code or label contains any of `needles`,
    /// compared case-insensitively.
    pub fn lookup(&self, needles: &[&str]) -> Option<&IndicatorValue> {
        self.entries
            .iter()
            .find(|e| {
                let field = e.field.to_lowercase();
                let label = e.label.to_lowercase();
                needles.iter().any(|n| {
                    let n = n.to_lowercase();
                    field.contains(&n) || label.contains(&n)
                })
            })
            .map(|e| &e.value)
    }

    /// Build a rendered sheet from a raw scanner response.
    ///
    /// Fields are emitted in [`TECHNICAL_FIELDS`] order; missing, null and
    /// NaN readings are skipped.
    pub fn from_raw(raw: &Map<String, Value>, interval: Interval) -> Self {
        let mut sheet = Self::new();
        for (code, label) in TECHNICAL_FIELDS {
            let keyed = interval
                .field_suffix()
                .and_then(|suffix| raw.get(&format!("{}|{}", code, suffix)));
            let Some(value) = keyed.or_else(|| raw.get(*code)).and_then(Value::as_f64) else {
                continue;
            };
            if let Some(text) = interpret_indicator(code, value) {
                sheet.push(
                    *code,
                    format!("{} ({})", label, interval.label()),
                    IndicatorValue::Text(text),
                );
            }
        }
        sheet
    }
}

/// Label for a scanner recommendation score in [-1, 1]
pub fn interpret_recommendation(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        return None;
    }
    Some(if value >= 0.5 {
        "Strong Buy"
    } else if value >= 0.1 {
        "Buy"
    } else if value <= -0.5 {
        "Strong Sell"
    } else if value <= -0.1 {
        "Sell"
    } else {
        "Neutral"
    })
}

/// Render one reading for display, `None` for NaN.
pub fn interpret_indicator(field: &str, value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }

    let name = field.to_lowercase();
    if field.starts_with("Recommend") || field.starts_with("Rec.") {
        return interpret_recommendation(value).map(str::to_string);
    }
    if PRICE_WORDS.iter().any(|w| name.contains(w)) {
        return Some(format_usd(value));
    }
    if name.contains("rsi") {
        let meaning = if value > 70.0 {
            "Overbought"
        } else if value < 30.0 {
            "Oversold"
        } else {
            "Neutral"
        };
        return Some(format!("{:.2} ({})", value, meaning));
    }
    if name.contains("macd") || name.starts_with("ao") {
        let meaning = if value > 0.0 {
            "Bullish"
        } else if value < 0.0 {
            "Bearish"
        } else {
            "Neutral"
        };
        return Some(format!("{:.2} ({})", value, meaning));
    }
    Some(format!("{:.2}", value))
}

/// `1234.5` → `"$1,234.50"`
pub fn format_usd(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_percent_reading() {
        assert_eq!(IndicatorValue::Number(2.0).percent(), Some(0.02));
        assert!((IndicatorValue::Text("3.5%".into()).percent().unwrap() - 0.035).abs() < 1e-12);
        assert_eq!(IndicatorValue::Number(f64::NAN).percent(), None);
        assert_eq!(IndicatorValue::Text("n/a".into()).percent(), None);
    }

    #[test]
    fn test_recommendation_bands() {
        assert_eq!(interpret_recommendation(0.5), Some("Strong Buy"));
        assert_eq!(interpret_recommendation(0.2), Some("Buy"));
        assert_eq!(interpret_recommendation(0.0), Some("Neutral"));
        assert_eq!(interpret_recommendation(-0.1), Some("Sell"));
        assert_eq!(interpret_recommendation(-0.7), Some("Strong Sell"));
        assert_eq!(interpret_recommendation(f64::NAN), None);
    }

    #[test]
    fn test_interpret_indicator_kinds() {
        assert_eq!(interpret_indicator("SMA50", 102_794.0).unwrap(), "$102,794.00");
        assert_eq!(interpret_indicator("RSI", 75.123).unwrap(), "75.12 (Overbought)");
        assert_eq!(interpret_indicator("RSI", 25.0).unwrap(), "25.00 (Oversold)");
        assert_eq!(interpret_indicator("MACD.macd", -12.4).unwrap(), "-12.40 (Bearish)");
        assert_eq!(interpret_indicator("AO", 3.0).unwrap(), "3.00 (Bullish)");
        assert_eq!(interpret_indicator("Rec.WR", 1.0).unwrap(), "Strong Buy");
        assert_eq!(interpret_indicator("ADX", 21.456).unwrap(), "21.46");
        assert!(interpret_indicator("ADX", f64::NAN).is_none());
    }

    #[test]
    fn test_format_usd_grouping() {
        assert_eq!(format_usd(0.5), "$0.50");
        assert_eq!(format_usd(999.999), "$1,000.00");
        assert_eq!(format_usd(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_usd(-4_200.0), "-$4,200.00");
    }

    #[test]
    fn test_from_raw_relabels_and_orders() {
        let raw = json!({
            "SMA50|240": 64_000.5,
            "RSI|240": 55.0,
            "close|240": 65_100.0,
            "ADX|240": null,
            "Unknown|240": 1.0
        });
        let sheet = IndicatorSheet::from_raw(raw.as_object().unwrap(), Interval::FourHours);

        let labels: Vec<_> = sheet.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Relative Strength Index (RSI) (4-Hour)",
                "Closing Price (4-Hour)",
                "Simple Moving Average (50) (4-Hour)",
            ]
        );
        assert_eq!(sheet.lookup(&["sma50"]).and_then(|v| v.money()), Some(64_000.5));
        assert_eq!(sheet.lookup(&["close", "price"]).and_then(|v| v.money()), Some(65_100.0));
        assert_eq!(sheet.lookup(&["rsi"]).and_then(|v| v.signed()), Some(55.0));
        assert!(sheet.lookup(&["volatility"]).is_none());
    }

    #[test]
    fn test_daily_fields_have_no_suffix() {
        assert!(field_codes(Interval::OneDay).contains(&"RSI".to_string()));
        assert!(field_codes(Interval::OneWeek).contains(&"RSI|1W".to_string()));
    }
}
