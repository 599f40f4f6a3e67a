//! Booking flow on top of a store.
//!
//! Every write re-resolves the provider's availability for the target date
//! against the rules currently in the store, so a client holding a stale slot
//! list cannot book a time the provider has since withdrawn. Dates before today
//! are never bookable. Occupancy is then enforced by the store itself.

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::booking::{Booking, BookingRequest, BookingStatus};
use crate::config::SchedulingConfig;
use crate::error::{Result, SchedulingError};
use crate::recurrence::{future_dates, RecurrenceType, MAX_SERIES_OCCURRENCES};
use crate::resolver::{is_slot_available, resolve_with_exclusions, DaySlots};
use crate::store::{AvailabilityStore, BookingStore};
use crate::time::ClockTime;

pub struct BookingService<S> {
    store: S,
    config: SchedulingConfig,
    today: Option<NaiveDate>,
}

impl<S> BookingService<S>
where
    S: AvailabilityStore + BookingStore,
{
    pub fn new(store: S, config: SchedulingConfig) -> Self {
        Self {
            store,
            config,
            today: None,
        }
    }

    /// Treat `today` as the current date instead of reading the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The pinned date, or the current date in the configured timezone.
    pub fn today(&self) -> Result<NaiveDate> {
        match self.today {
            Some(today) => Ok(today),
            None => self.config.today(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Resolve the provider's slots over `days` days from `window_start`,
    /// without blackout dates and without times held by active bookings.
    pub fn available_slots(
        &self,
        provider_id: &str,
        window_start: NaiveDate,
        days: u32,
    ) -> Result<Vec<DaySlots>> {
        let mut resolved = self.resolve_rules(provider_id, window_start, days)?;

        let held: Vec<Booking> = self
            .store
            .bookings_for_provider(provider_id)?
            .into_iter()
            .filter(|b| b.status.is_active())
            .collect();

        for day in &mut resolved {
            let date = day.date;
            day.times
                .retain(|time| !held.iter().any(|b| b.holds(provider_id, date, *time)));
        }
        resolved.retain(|day| !day.times.is_empty());

        Ok(resolved)
    }

    /// Book a single slot. The booking starts `pending` and `unpaid`.
    pub fn create_booking(&self, request: BookingRequest) -> Result<Booking> {
        self.ensure_resolvable(
            &request.provider_id,
            request.scheduled_date,
            request.scheduled_time,
        )?;

        let booking = request.into_booking(Utc::now());
        self.store.insert_bookings(std::slice::from_ref(&booking))?;

        info!(
            booking_id = %booking.id,
            provider_id = %booking.provider_id,
            client_id = %booking.client_id,
            date = %booking.scheduled_date,
            time = %booking.scheduled_time,
            "created booking"
        );
        Ok(booking)
    }

    /// Book the same time on every date of a recurring series.
    ///
    /// The whole series is validated before anything is written, and the
    /// store inserts it all-or-nothing.
    pub fn create_recurring_bookings(
        &self,
        request: BookingRequest,
        recurrence: RecurrenceType,
        occurrences: u32,
    ) -> Result<Vec<Booking>> {
        if occurrences > MAX_SERIES_OCCURRENCES {
            return Err(SchedulingError::InvalidRule(format!(
                "a recurring booking can have at most {} occurrences, got {}",
                MAX_SERIES_OCCURRENCES, occurrences
            )));
        }
        let dates = future_dates(request.scheduled_date, recurrence, occurrences);
        if dates.is_empty() {
            return Err(SchedulingError::InvalidRule(
                "a recurring booking needs at least one occurrence".to_string(),
            ));
        }

        for date in &dates {
            self.ensure_resolvable(&request.provider_id, *date, request.scheduled_time)?;
        }

        let group = Uuid::new_v4();
        let now = Utc::now();
        let bookings: Vec<Booking> = dates
            .iter()
            .enumerate()
            .map(|(i, date)| {
                let mut booking = BookingRequest {
                    scheduled_date: *date,
                    ..request.clone()
                }
                .into_booking(now);
                booking.is_recurring = true;
                booking.recurrence_group = Some(group);
                booking.recurrence_sequence = Some(i as u32 + 1);
                booking
            })
            .collect();

        self.store.insert_bookings(&bookings)?;

        info!(
            recurrence_group = %group,
            provider_id = %request.provider_id,
            occurrences = bookings.len(),
            ?recurrence,
            "created recurring bookings"
        );
        Ok(bookings)
    }

    /// Cancel a pending or confirmed booking.
    ///
    /// The refund defaults to the full price and is only recorded when positive.
    pub fn cancel_booking(
        &self,
        booking_id: Uuid,
        reason: &str,
        refund_amount: Option<i64>,
    ) -> Result<Booking> {
        let mut booking = self.store.booking(booking_id)?;
        if !matches!(
            booking.status,
            BookingStatus::Pending | BookingStatus::Confirmed
        ) {
            warn!(%booking_id, status = %booking.status, "refusing to cancel booking");
            return Err(SchedulingError::InvalidTransition {
                action: "cancel",
                status: booking.status.to_string(),
            });
        }

        let refund = refund_amount.unwrap_or(booking.price);
        let now = Utc::now();
        booking.status = BookingStatus::Cancelled;
        booking.cancellation_reason = Some(reason.to_string());
        booking.cancelled_at = Some(now);
        booking.refund_amount = (refund > 0).then_some(refund);
        booking.updated_at = now;

        self.store.update_booking(&booking)?;
        info!(%booking_id, refund, "cancelled booking");
        Ok(booking)
    }

    /// Move an active booking to another resolvable, free slot.
    pub fn reschedule_booking(
        &self,
        booking_id: Uuid,
        new_date: NaiveDate,
        new_time: ClockTime,
    ) -> Result<Booking> {
        let mut booking = self.store.booking(booking_id)?;
        if !matches!(
            booking.status,
            BookingStatus::Pending | BookingStatus::Confirmed
        ) {
            return Err(SchedulingError::InvalidTransition {
                action: "reschedule",
                status: booking.status.to_string(),
            });
        }

        self.ensure_resolvable(&booking.provider_id, new_date, new_time)?;

        booking.scheduled_date = new_date;
        booking.scheduled_time = new_time;
        booking.updated_at = Utc::now();

        self.store.update_booking(&booking)?;
        info!(%booking_id, date = %new_date, time = %new_time, "rescheduled booking");
        Ok(booking)
    }

    /// Mark a booking completed. Cancelled bookings cannot be completed.
    pub fn complete_booking(&self, booking_id: Uuid) -> Result<Booking> {
        let mut booking = self.store.booking(booking_id)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(SchedulingError::InvalidTransition {
                action: "complete",
                status: booking.status.to_string(),
            });
        }

        booking.status = BookingStatus::Completed;
        booking.updated_at = Utc::now();

        self.store.update_booking(&booking)?;
        info!(%booking_id, "completed booking");
        Ok(booking)
    }

    fn resolve_rules(
        &self,
        provider_id: &str,
        window_start: NaiveDate,
        days: u32,
    ) -> Result<Vec<DaySlots>> {
        let today = self.today()?;
        let recurring = self.store.recurring_rules(provider_id)?;
        // Rules that ended before the window cannot contribute either.
        let ranged = self
            .store
            .ranged_rules(provider_id, today.min(window_start))?;
        let excluded: Vec<NaiveDate> = self
            .store
            .unavailable_dates(provider_id, window_start)?
            .into_iter()
            .map(|d| d.date)
            .collect();

        Ok(resolve_with_exclusions(
            provider_id,
            window_start,
            days,
            &recurring,
            &ranged,
            self.config.increment_minutes,
            &excluded,
        ))
    }

    fn ensure_resolvable(&self, provider_id: &str, date: NaiveDate, time: ClockTime) -> Result<()> {
        let bookable = date >= self.today()? && {
            let resolved = self.resolve_rules(provider_id, date, 1)?;
            is_slot_available(&resolved, date, time)
        };
        if bookable {
            Ok(())
        } else {
            warn!(provider_id, %date, %time, "requested time is not an available slot");
            Err(SchedulingError::SlotUnavailable {
                provider_id: provider_id.to_string(),
                date,
                time: time.to_string(),
            })
        }
    }
}
