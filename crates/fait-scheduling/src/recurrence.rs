//! Dates for recurring booking series.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};

/// Longest series a single request may book: a year of weekly visits.
pub const MAX_SERIES_OCCURRENCES: u32 = 52;

/// How often a recurring booking repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    Weekly,
    Biweekly,
    Monthly,
}

impl std::str::FromStr for RecurrenceType {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(SchedulingError::InvalidRule(format!(
                "unknown recurrence '{}', expected weekly, biweekly or monthly",
                other
            ))),
        }
    }
}

/// Dates of a series of `occurrences` bookings starting on `start`.
///
/// Monthly series are anchored on `start`, so a series starting on Jan 31
/// lands on Feb 28/29, then Mar 31. Occurrences that would overflow the
/// calendar are dropped.
pub fn future_dates(start: NaiveDate, recurrence: RecurrenceType, occurrences: u32) -> Vec<NaiveDate> {
    (0..occurrences)
        .map_while(|i| match recurrence {
            RecurrenceType::Weekly => start.checked_add_days(Days::new(u64::from(i) * 7)),
            RecurrenceType::Biweekly => start.checked_add_days(Days::new(u64::from(i) * 14)),
            RecurrenceType::Monthly => start.checked_add_months(Months::new(i)),
        })
        .collect()
}
