//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of the different string-ish values
//! that flow through the queue (an operation code is not a run stamp) and
//! make dedup keys self-documenting.

use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The logical operation code embedded in a payload filename.
///
/// Free text; payloads whose names cannot be parsed report the sentinel
/// code returned by [`OpCode::unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpCode(String);

impl OpCode {
    pub fn new(s: impl Into<String>) -> Self {
        OpCode(s.into())
    }

    /// The sentinel code for payloads with unrecognized filenames.
    pub fn unknown() -> Self {
        OpCode("Unknown".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OpCode {
    fn from(s: &str) -> Self {
        OpCode(s.to_string())
    }
}

/// The processing-week date embedded in a payload filename (`YYYY-MM-DD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekKey(NaiveDate);

impl WeekKey {
    pub fn new(date: NaiveDate) -> Self {
        WeekKey(date)
    }

    /// Parses a `YYYY-MM-DD` string into a week key.
    ///
    /// Returns `None` for anything that is not a valid calendar date in
    /// exactly that format.
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(WeekKey)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A compact UTC stamp identifying one scheduler tick (`YYYYMMDDHHMMSS`).
///
/// Used as the run identifier in notifications and as the timestamp prefix
/// in `processed_`/`result_`/`failed_` filenames, so everything a single
/// tick produced can be correlated after the fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunStamp(String);

impl RunStamp {
    /// Mints a stamp for the current instant.
    pub fn now() -> Self {
        RunStamp(Utc::now().format("%Y%m%d%H%M%S").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunStamp {
    fn from(s: &str) -> Self {
        RunStamp(s.to_string())
    }
}
