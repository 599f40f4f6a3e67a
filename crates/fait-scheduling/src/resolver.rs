//! Availability-to-slot resolution.
//!
//! Merges a provider's weekly rules with its date-ranged rules over a window of
//! calendar days, then expands every matching rule into start times spaced a
//! fixed increment apart. Each rule covers the half-open window
//! `[start_time, end_time)`: a rule ending at 17:00 never yields 17:00.
//!
//! Resolution is permissive. A rule with unreadable times, or with
//! `start_time >= end_time`, contributes nothing instead of failing the call.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::rules::{DateRangeAvailabilityRule, RecurringAvailabilityRule};
use crate::time::ClockTime;

/// Increment used by the booking flow when none is configured.
pub const DEFAULT_INCREMENT_MINUTES: u32 = 30;

/// Bookable start times on one date, ascending and unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub times: Vec<ClockTime>,
}

/// A single bookable slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSlot {
    pub date: NaiveDate,
    pub time: ClockTime,
    pub duration_minutes: u32,
}

/// Resolve bookable slots for `provider_id` over `window_length_days` days
/// starting at `window_start`.
///
/// Days with no matching rule are omitted, as are days whose rules all fail to
/// produce a time. Rules that belong to a different provider are ignored.
///
/// # Arguments
/// - `provider_id` -- the provider whose rules apply
/// - `window_start` -- first calendar day of the window
/// - `window_length_days` -- number of days to consider, `window_start` included
/// - `recurring` -- weekly rules (day 0 = Sunday)
/// - `ranged` -- date-bounded rules, end date inclusive
/// - `increment_minutes` -- spacing between generated start times
pub fn resolve(
    provider_id: &str,
    window_start: NaiveDate,
    window_length_days: u32,
    recurring: &[RecurringAvailabilityRule],
    ranged: &[DateRangeAvailabilityRule],
    increment_minutes: u32,
) -> Vec<DaySlots> {
    resolve_with_exclusions(
        provider_id,
        window_start,
        window_length_days,
        recurring,
        ranged,
        increment_minutes,
        &[],
    )
}

/// Identical to [`resolve`] but skips every date in `excluded` (provider
/// blackout days), even when rules cover it.
pub fn resolve_with_exclusions(
    provider_id: &str,
    window_start: NaiveDate,
    window_length_days: u32,
    recurring: &[RecurringAvailabilityRule],
    ranged: &[DateRangeAvailabilityRule],
    increment_minutes: u32,
    excluded: &[NaiveDate],
) -> Vec<DaySlots> {
    let mut resolved = Vec::new();

    for date in window_start.iter_days().take(window_length_days as usize) {
        if excluded.contains(&date) {
            trace!(%date, "skipping blackout date");
            continue;
        }

        let windows = recurring
            .iter()
            .filter(|rule| rule.provider_id == provider_id && rule.applies_on(date))
            .map(|rule| (rule.start_time.as_str(), rule.end_time.as_str()))
            .chain(
                ranged
                    .iter()
                    .filter(|rule| rule.provider_id == provider_id && rule.applies_on(date))
                    .map(|rule| (rule.start_time.as_str(), rule.end_time.as_str())),
            );

        // BTreeSet gives both de-duplication and ascending order.
        let mut times = BTreeSet::new();
        for (start, end) in windows {
            times.extend(expand_window(start, end, increment_minutes));
        }

        if !times.is_empty() {
            resolved.push(DaySlots {
                date,
                times: times.into_iter().collect(),
            });
        }
    }

    debug!(
        provider_id,
        %window_start,
        window_length_days,
        days = resolved.len(),
        slots = resolved.iter().map(|d| d.times.len()).sum::<usize>(),
        "resolved availability"
    );

    resolved
}

/// Expand `[start, end)` into start times `increment_minutes` apart.
fn expand_window(start: &str, end: &str, increment_minutes: u32) -> Vec<ClockTime> {
    if increment_minutes == 0 {
        return Vec::new();
    }
    let (Ok(start), Ok(end)) = (ClockTime::parse(start), ClockTime::parse(end)) else {
        trace!(start, end, "ignoring rule with unreadable times");
        return Vec::new();
    };

    let mut points = Vec::new();
    let mut current = Some(start);
    while let Some(time) = current {
        if time >= end {
            break;
        }
        points.push(time);
        current = time.checked_add_minutes(increment_minutes);
    }
    points
}

/// Flatten grouped output into individual slots of `duration_minutes` each.
pub fn flatten_slots(days: &[DaySlots], duration_minutes: u32) -> Vec<ResolvedSlot> {
    days.iter()
        .flat_map(|day| {
            day.times.iter().map(move |time| ResolvedSlot {
                date: day.date,
                time: *time,
                duration_minutes,
            })
        })
        .collect()
}

/// Whether `time` on `date` is one of the resolved start times.
pub fn is_slot_available(days: &[DaySlots], date: NaiveDate, time: ClockTime) -> bool {
    days.iter()
        .find(|day| day.date == date)
        .is_some_and(|day| day.times.binary_search(&time).is_ok())
}
