//! Timestamp utilities.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A wrapper around DateTime<Utc> with consistent serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

/// Calendar fields of a timestamp, as stored in archive entry headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    /// Create a timestamp from a filesystem time.
    pub fn from_system_time(time: SystemTime) -> Self {
        Timestamp(DateTime::<Utc>::from(time))
    }

    /// Seconds since the Unix epoch.
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Format as ISO 8601 string.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }

    /// Split into calendar fields (UTC). Years outside `u16` yield `None`.
    pub fn calendar_fields(&self) -> Option<CalendarFields> {
        let year = u16::try_from(self.0.year()).ok()?;
        Some(CalendarFields {
            year,
            month: self.0.month() as u8,
            day: self.0.day() as u8,
            hour: self.0.hour() as u8,
            minute: self.0.minute() as u8,
            second: self.0.second() as u8,
        })
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}
