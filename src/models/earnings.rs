use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One row of the upstream earnings calendar, kept as loose as the API is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<String>, // Finnhub's name for the session flag
}

impl RawEvent {
    pub fn new(symbol: &str, date: &str, time: Option<&str>) -> Self {
        Self {
            symbol: Some(symbol.to_string()),
            date: Some(date.to_string()),
            time: time.map(str::to_string),
            hour: None,
        }
    }

    /// Raw time-of-day value, preferring `time` over `hour`.
    pub fn time_of_day(&self) -> Option<&str> {
        self.time.as_deref().or(self.hour.as_deref())
    }
}

/// Session of an earnings release relative to market hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFlag {
    /// Before market open.
    Bmo,
    /// After market close.
    Amc,
    /// Unknown or not announced.
    Tbd,
}

impl TimeFlag {
    /// Normalize a raw upstream value; anything unrecognised is `Tbd`.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("bmo") => TimeFlag::Bmo,
            Some("amc") => TimeFlag::Amc,
            _ => TimeFlag::Tbd,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFlag::Bmo => "bmo",
            TimeFlag::Amc => "amc",
            TimeFlag::Tbd => "tbd",
        }
    }
}

impl fmt::Display for TimeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The next upcoming earnings event for one symbol.
///
/// Fields are declared in the alphabetical order of their JSON keys so the
/// persisted document is key-sorted at every level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsRecord {
    #[serde(rename = "finnhubCount")]
    pub source_row_count: usize,
    #[serde(rename = "lastUpdatedUtc", with = "crate::models::timestamp")]
    pub last_updated: DateTime<Utc>,
    #[serde(rename = "nextEarningsDate")]
    pub next_earnings_date: NaiveDate,
    pub symbol: String,
    pub time: TimeFlag,
}

/// Symbol -> next earnings record. `BTreeMap` keeps keys sorted on output.
pub type EarningsIndex = BTreeMap<String, EarningsRecord>;
