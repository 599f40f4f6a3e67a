//! Minute-precision wall-clock time of day.
//!
//! Availability rules and bookings carry times as `HH:MM` strings (the store
//! also hands back `HH:MM:SS`). `ClockTime` is the parsed form: minutes since
//! midnight, rendered zero-padded so that string order and chronological order
//! agree.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SchedulingError};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A time of day between `00:00` and `23:59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Build from hour and minute, rejecting out-of-range components.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    /// Parse `HH:MM` or `HH:MM:SS`. Seconds are accepted and dropped.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map(Self::from)
            .map_err(|e| SchedulingError::InvalidTime(format!("'{}': {}", s, e)))
    }

    pub fn hour(self) -> u32 {
        u32::from(self.0) / 60
    }

    pub fn minute(self) -> u32 {
        u32::from(self.0) % 60
    }

    pub fn minutes_since_midnight(self) -> u32 {
        u32::from(self.0)
    }

    /// Advance by `minutes`, carrying into the hour. Returns `None` past midnight.
    pub fn checked_add_minutes(self, minutes: u32) -> Option<Self> {
        let total = u32::from(self.0).checked_add(minutes)?;
        if total < MINUTES_PER_DAY {
            Some(Self(total as u16))
        } else {
            None
        }
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // hour() < 24 and minute() < 60 by construction.
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl From<NaiveTime> for ClockTime {
    fn from(t: NaiveTime) -> Self {
        Self((t.hour() * 60 + t.minute()) as u16)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
