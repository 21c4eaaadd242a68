//! Analysis intervals

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SageError;

/// Chart interval, named the way users ask for it ("4 hours", "1 week")
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    TwoHours,
    FourHours,
    #[default]
    OneDay,
    OneWeek,
    OneMonth,
}

impl Interval {
    pub const ALL: [Interval; 10] = [
        Interval::OneMinute,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::OneHour,
        Interval::TwoHours,
        Interval::FourHours,
        Interval::OneDay,
        Interval::OneWeek,
        Interval::OneMonth,
    ];

    /// Human-readable name accepted by [`FromStr`]
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::OneMinute => "1 minute",
            Interval::FiveMinutes => "5 minutes",
            Interval::FifteenMinutes => "15 minutes",
            Interval::ThirtyMinutes => "30 minutes",
            Interval::OneHour => "1 hour",
            Interval::TwoHours => "2 hours",
            Interval::FourHours => "4 hours",
            Interval::OneDay => "1 day",
            Interval::OneWeek => "1 week",
            Interval::OneMonth => "1 month",
        }
    }

    /// Scanner field suffix (`RSI|240`); daily fields carry none
    pub fn field_suffix(self) -> Option<&'static str> {
        match self {
            Interval::OneMinute => Some("1"),
            Interval::FiveMinutes => Some("5"),
            Interval::FifteenMinutes => Some("15"),
            Interval::ThirtyMinutes => Some("30"),
            Interval::OneHour => Some("60"),
            Interval::TwoHours => Some("120"),
            Interval::FourHours => Some("240"),
            Interval::OneDay => None,
            Interval::OneWeek => Some("1W"),
            Interval::OneMonth => Some("1M"),
        }
    }

    /// Label appended to indicator names
    pub fn label(self) -> &'static str {
        match self {
            Interval::OneMinute => "1-Minute",
            Interval::FiveMinutes => "5-Minute",
            Interval::FifteenMinutes => "15-Minute",
            Interval::ThirtyMinutes => "30-Minute",
            Interval::OneHour => "1-Hour",
            Interval::TwoHours => "2-Hour",
            Interval::FourHours => "4-Hour",
            Interval::OneDay => "Daily",
            Interval::OneWeek => "Weekly",
            Interval::OneMonth => "Monthly",
        }
    }

    /// Days of OHLC history requested for SMC analysis at this interval
    pub fn ohlc_days(self) -> u32 {
        match self {
            Interval::OneMinute
            | Interval::FiveMinutes
            | Interval::FifteenMinutes
            | Interval::ThirtyMinutes => 1,
            Interval::OneHour | Interval::TwoHours => 7,
            Interval::FourHours => 30,
            Interval::OneDay | Interval::OneWeek | Interval::OneMonth => 180,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = SageError;

    /// Exact match on the human-readable name; anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str() == s.trim())
            .ok_or_else(|| SageError::UnsupportedInterval(s.to_string()))
    }
}

impl TryFrom<String> for Interval {
    type Error = SageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.as_str().to_string()
    }
}
