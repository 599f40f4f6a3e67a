//! Persistence seams.
//!
//! The booking flow never talks to a database directly. It is handed an
//! implementation of these traits, which lets tests and the CLI swap in
//! [`InMemoryStore`](crate::memory::InMemoryStore).

use chrono::NaiveDate;
use uuid::Uuid;

use crate::booking::Booking;
use crate::error::Result;
use crate::rules::{DateRangeAvailabilityRule, RecurringAvailabilityRule, UnavailableDate};

/// Read and write access to provider availability.
pub trait AvailabilityStore {
    /// All weekly rules for the provider.
    fn recurring_rules(&self, provider_id: &str) -> Result<Vec<RecurringAvailabilityRule>>;

    /// Date-ranged rules for the provider that have not ended before `today`.
    fn ranged_rules(
        &self,
        provider_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<DateRangeAvailabilityRule>>;

    /// Blackout dates on or after `from`.
    fn unavailable_dates(&self, provider_id: &str, from: NaiveDate)
        -> Result<Vec<UnavailableDate>>;

    /// Store a weekly rule. Implementations must reject invalid rules.
    fn add_recurring_rule(&self, rule: RecurringAvailabilityRule) -> Result<()>;

    /// Replace all of the provider's weekly rules on `day_of_week` with
    /// `rules`, all or nothing. An empty `rules` clears the day.
    fn replace_recurring_rules(
        &self,
        provider_id: &str,
        day_of_week: u8,
        rules: Vec<RecurringAvailabilityRule>,
    ) -> Result<()>;

    /// Store a date-ranged rule. Implementations must reject invalid rules.
    fn add_ranged_rule(&self, rule: DateRangeAvailabilityRule) -> Result<()>;

    /// Withdraw the date-ranged rule with the same provider, dates and times.
    /// Returns `false` when no such rule is stored.
    fn remove_ranged_rule(&self, rule: &DateRangeAvailabilityRule) -> Result<bool>;

    /// Mark a date unavailable, replacing the reason if it is already marked.
    fn add_unavailable_date(&self, date: UnavailableDate) -> Result<()>;

    /// Returns `false` when the date was not marked.
    fn remove_unavailable_date(&self, provider_id: &str, date: NaiveDate) -> Result<bool>;
}

/// Booking records.
///
/// Writes are where double booking is prevented: `insert_bookings` and
/// `update_booking` must check slot occupancy and write in one atomic step,
/// failing with [`SchedulingError::SlotTaken`](crate::SchedulingError::SlotTaken)
/// when another active booking holds the same provider, date and time.
pub trait BookingStore {
    /// Insert every booking or none of them.
    fn insert_bookings(&self, bookings: &[Booking]) -> Result<()>;

    /// Fails with `BookingNotFound` for an unknown id.
    fn booking(&self, id: Uuid) -> Result<Booking>;

    fn bookings_for_provider(&self, provider_id: &str) -> Result<Vec<Booking>>;

    fn bookings_for_client(&self, client_id: &str) -> Result<Vec<Booking>>;

    /// Replace the stored booking with the same id.
    fn update_booking(&self, booking: &Booking) -> Result<()>;
}
