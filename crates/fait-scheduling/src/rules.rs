//! Provider availability rules.
//!
//! Two shapes exist side by side in the store: weekly rules tied to a day of
//! the week, and date-ranged rules tied to explicit calendar dates. Times stay
//! as the raw strings the store returned; the resolver parses them lazily and
//! skips anything it cannot read.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};
use crate::time::ClockTime;

/// Every `day_of_week`, available from `start_time` to `end_time`.
///
/// `day_of_week` counts from Sunday: 0 = Sunday, 1 = Monday, ..., 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringAvailabilityRule {
    pub provider_id: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

/// Available from `start_time` to `end_time` on every date in
/// `start_date..=end_date`, regardless of weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeAvailabilityRule {
    pub provider_id: String,
    pub start_date: NaiveDate,
    /// Inclusive. Absent means a single-day rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
}

/// A day on which the provider takes no bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableDate {
    pub provider_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub reason: String,
}

/// Sunday-based weekday index of `date` (0 = Sunday).
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

impl RecurringAvailabilityRule {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.day_of_week == weekday_index(date)
    }

    /// Reject rules the availability form would not have accepted.
    pub fn validate(&self) -> Result<()> {
        if self.day_of_week > 6 {
            return Err(SchedulingError::InvalidRule(format!(
                "day_of_week must be between 0 and 6, got {}",
                self.day_of_week
            )));
        }
        validate_window(&self.start_time, &self.end_time)
    }
}

impl DateRangeAvailabilityRule {
    pub fn effective_end_date(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }

    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.effective_end_date()
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.effective_end_date() {
            return Err(SchedulingError::InvalidRule(format!(
                "end date {} is before start date {}",
                self.effective_end_date(),
                self.start_date
            )));
        }
        validate_window(&self.start_time, &self.end_time)
    }
}

fn validate_window(start_time: &str, end_time: &str) -> Result<()> {
    let start = ClockTime::parse(start_time)?;
    let end = ClockTime::parse(end_time)?;
    if start >= end {
        return Err(SchedulingError::InvalidRule(format!(
            "end time {} must be after start time {}",
            end, start
        )));
    }
    Ok(())
}
