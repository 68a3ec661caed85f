//! Stock records held in the shared store.

use super::series::PricePoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sector-neutral earnings-surprise group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Group {
    Miss,
    Meet,
    Beat,
}

impl Group {
    /// All groups in report order.
    pub const ALL: [Group; 3] = [Group::Miss, Group::Meet, Group::Beat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Miss => "Miss",
            Group::Meet => "Meet",
            Group::Beat => "Beat",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Group {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "miss" => Ok(Group::Miss),
            "meet" => Ok(Group::Meet),
            "beat" => Ok(Group::Beat),
            other => Err(format!("unknown group '{other}' (expected beat, meet or miss)")),
        }
    }
}

/// One earnings announcement as loaded from the earnings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsInfo {
    pub announcement: NaiveDate,
    pub period_ending: String,
    pub estimate: f64,
    pub reported: f64,
    pub surprise: f64,
    pub surprise_pct: f64,
}

/// Resolved window boundaries committed alongside the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub start: NaiveDate,
    pub event_day: NaiveDate,
    pub end: NaiveDate,
}

/// Everything the pipeline derives for one ticker.
///
/// `prices` has `2N + 1` points; the three return series have `2N` values,
/// index 0 being event day `-N + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub window: WindowBounds,
    pub prices: Vec<PricePoint>,
    pub returns: Vec<f64>,
    pub cumulative_returns: Vec<f64>,
    pub abnormal_returns: Vec<f64>,
    /// Set when the announcement fell on a non-trading day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub ticker: String,
    pub earnings: EarningsInfo,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub group: Option<Group>,
    pub event: Option<EventData>,
}

impl StockRecord {
    pub fn new(ticker: impl Into<String>, earnings: EarningsInfo) -> Self {
        Self {
            ticker: ticker.into(),
            earnings,
            company_name: None,
            sector: None,
            group: None,
            event: None,
        }
    }

    pub fn announcement(&self) -> NaiveDate {
        self.earnings.announcement
    }

    pub fn has_prices(&self) -> bool {
        self.event.as_ref().is_some_and(|e| !e.prices.is_empty())
    }

    pub fn abnormal_returns(&self) -> &[f64] {
        self.event
            .as_ref()
            .map(|e| e.abnormal_returns.as_slice())
            .unwrap_or(&[])
    }
}
