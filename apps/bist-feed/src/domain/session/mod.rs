//! Session Time
//!
//! [`BistTime`] is the most recent session clock reported by the feed. It is
//! replaced wholesale on every session-time message; no history is kept.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Market session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Session closed (`0`).
    Closed,
    /// Continuous trading (`1`).
    Open,
    /// Between sessions (`2`).
    Intermission,
}

impl SessionState {
    /// Parse the wire state code. Unknown codes yield `None`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(Self::Closed),
            "1" => Some(Self::Open),
            "2" => Some(Self::Intermission),
            _ => None,
        }
    }

    /// Wire code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Closed => "0",
            Self::Open => "1",
            Self::Intermission => "2",
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Closed => "Seans Kapalı",
            Self::Open => "Seans Açık",
            Self::Intermission => "Seans Arası",
        }
    }
}

/// Session clock snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BistTime {
    /// Date as sent by the feed.
    pub date: String,
    /// Time as sent by the feed.
    pub time: String,
    /// Parsed date and time, when both parse.
    pub timestamp: Option<NaiveDateTime>,
    /// Session state.
    pub state: SessionState,
    /// Description of `state`.
    pub description: String,
}

impl BistTime {
    /// Build a snapshot from raw date/time strings.
    #[must_use]
    pub fn new(date: &str, time: &str, state: SessionState) -> Self {
        let timestamp = parse_date(date)
            .zip(parse_time(time))
            .map(|(d, t)| d.and_time(t));
        Self {
            date: date.trim().to_string(),
            time: time.trim().to_string(),
            timestamp,
            state,
            description: state.description().to_string(),
        }
    }

    /// Whether trading is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }
}

/// Parse `YYYYMMDD`, `YYYY-MM-DD` or `YYYY.MM.DD`.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ["%Y%m%d", "%Y-%m-%d", "%Y.%m.%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Parse `HH:MM:SS` or `HHMMSS`.
#[must_use]
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    ["%H:%M:%S", "%H%M%S"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}
