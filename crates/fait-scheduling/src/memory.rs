//! In-memory store backed by a JSON document.
//!
//! Used by the CLI (one JSON file per data set) and by tests as the
//! substitutable store.

use std::io::Write;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;
use uuid::Uuid;

use crate::booking::Booking;
use crate::error::{Result, SchedulingError};
use crate::rules::{DateRangeAvailabilityRule, RecurringAvailabilityRule, UnavailableDate};
use crate::store::{AvailabilityStore, BookingStore};
use crate::time::ClockTime;

/// Serialized form of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub recurring_rules: Vec<RecurringAvailabilityRule>,
    #[serde(default)]
    pub ranged_rules: Vec<DateRangeAvailabilityRule>,
    #[serde(default)]
    pub unavailable_dates: Vec<UnavailableDate>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<StoreSnapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::from_snapshot(serde_json::from_str(json)?))
    }

    /// Load from `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "data file missing, starting empty");
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| io_error("read", path, e))?;
        Self::from_json(&raw)
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(self.read()?.clone())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.read()?)?)
    }

    /// Write the store to `path` through a temporary file in the same
    /// directory, so readers see either the old document or the new one.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_error("create temp file in", dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| io_error("write", tmp.path(), e))?;
        tmp.persist(path).map_err(|e| io_error("replace", path, e.error))?;

        debug!(path = %path.display(), "saved data file");
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreSnapshot>> {
        self.data
            .read()
            .map_err(|_| SchedulingError::Store("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreSnapshot>> {
        self.data
            .write()
            .map_err(|_| SchedulingError::Store("store lock poisoned".to_string()))
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> SchedulingError {
    SchedulingError::Store(format!("failed to {} {}: {}", action, path.display(), err))
}

/// Same provider, dates and (parsed) times.
fn same_ranged_rule(a: &DateRangeAvailabilityRule, b: &DateRangeAvailabilityRule) -> bool {
    let same_time = |x: &str, y: &str| match (ClockTime::parse(x), ClockTime::parse(y)) {
        (Ok(x), Ok(y)) => x == y,
        _ => x == y,
    };
    a.provider_id == b.provider_id
        && a.start_date == b.start_date
        && a.effective_end_date() == b.effective_end_date()
        && same_time(&a.start_time, &b.start_time)
        && same_time(&a.end_time, &b.end_time)
}

fn slot_taken(booking: &Booking) -> SchedulingError {
    SchedulingError::SlotTaken {
        provider_id: booking.provider_id.clone(),
        date: booking.scheduled_date,
        time: booking.scheduled_time.to_string(),
    }
}

/// First active booking in `candidates` that collides with one in `existing`
/// (other than itself) or with an earlier candidate.
fn find_collision<'a>(existing: &[Booking], candidates: &'a [Booking]) -> Option<&'a Booking> {
    candidates.iter().enumerate().find_map(|(i, candidate)| {
        if !candidate.status.is_active() {
            return None;
        }
        let holds = |other: &Booking| {
            other.id != candidate.id
                && other.holds(
                    &candidate.provider_id,
                    candidate.scheduled_date,
                    candidate.scheduled_time,
                )
        };
        let collides = existing.iter().any(holds) || candidates[..i].iter().any(holds);
        collides.then_some(candidate)
    })
}

impl AvailabilityStore for InMemoryStore {
    fn recurring_rules(&self, provider_id: &str) -> Result<Vec<RecurringAvailabilityRule>> {
        let data = self.read()?;
        let mut rules: Vec<_> = data
            .recurring_rules
            .iter()
            .filter(|r| r.provider_id == provider_id)
            .cloned()
            .collect();
        rules.sort_by(|a, b| (a.day_of_week, &a.start_time).cmp(&(b.day_of_week, &b.start_time)));
        Ok(rules)
    }

    fn ranged_rules(
        &self,
        provider_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<DateRangeAvailabilityRule>> {
        let data = self.read()?;
        Ok(data
            .ranged_rules
            .iter()
            .filter(|r| r.provider_id == provider_id && r.effective_end_date() >= today)
            .cloned()
            .collect())
    }

    fn unavailable_dates(
        &self,
        provider_id: &str,
        from: NaiveDate,
    ) -> Result<Vec<UnavailableDate>> {
        let data = self.read()?;
        let mut dates: Vec<_> = data
            .unavailable_dates
            .iter()
            .filter(|d| d.provider_id == provider_id && d.date >= from)
            .cloned()
            .collect();
        dates.sort_by_key(|d| d.date);
        Ok(dates)
    }

    fn add_recurring_rule(&self, rule: RecurringAvailabilityRule) -> Result<()> {
        rule.validate()?;
        self.write()?.recurring_rules.push(rule);
        Ok(())
    }

    fn replace_recurring_rules(
        &self,
        provider_id: &str,
        day_of_week: u8,
        rules: Vec<RecurringAvailabilityRule>,
    ) -> Result<()> {
        if day_of_week > 6 {
            return Err(SchedulingError::InvalidRule(format!(
                "day_of_week must be between 0 and 6, got {}",
                day_of_week
            )));
        }
        for rule in &rules {
            rule.validate()?;
            if rule.provider_id != provider_id || rule.day_of_week != day_of_week {
                return Err(SchedulingError::InvalidRule(format!(
                    "rule for provider {} on day {} cannot replace day {} of provider {}",
                    rule.provider_id, rule.day_of_week, day_of_week, provider_id
                )));
            }
        }

        let mut data = self.write()?;
        data.recurring_rules
            .retain(|r| !(r.provider_id == provider_id && r.day_of_week == day_of_week));
        data.recurring_rules.extend(rules);
        Ok(())
    }

    fn add_ranged_rule(&self, rule: DateRangeAvailabilityRule) -> Result<()> {
        rule.validate()?;
        self.write()?.ranged_rules.push(rule);
        Ok(())
    }

    fn remove_ranged_rule(&self, rule: &DateRangeAvailabilityRule) -> Result<bool> {
        let mut data = self.write()?;
        let before = data.ranged_rules.len();
        data.ranged_rules.retain(|r| !same_ranged_rule(r, rule));
        Ok(data.ranged_rules.len() < before)
    }

    fn add_unavailable_date(&self, date: UnavailableDate) -> Result<()> {
        let mut data = self.write()?;
        match data
            .unavailable_dates
            .iter_mut()
            .find(|d| d.provider_id == date.provider_id && d.date == date.date)
        {
            Some(existing) => existing.reason = date.reason,
            None => data.unavailable_dates.push(date),
        }
        Ok(())
    }

    fn remove_unavailable_date(&self, provider_id: &str, date: NaiveDate) -> Result<bool> {
        let mut data = self.write()?;
        let before = data.unavailable_dates.len();
        data.unavailable_dates
            .retain(|d| !(d.provider_id == provider_id && d.date == date));
        Ok(data.unavailable_dates.len() < before)
    }
}

impl BookingStore for InMemoryStore {
    fn insert_bookings(&self, bookings: &[Booking]) -> Result<()> {
        let mut data = self.write()?;
        if let Some(collision) = find_collision(&data.bookings, bookings) {
            return Err(slot_taken(collision));
        }
        data.bookings.extend_from_slice(bookings);
        Ok(())
    }

    fn booking(&self, id: Uuid) -> Result<Booking> {
        self.read()?
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(SchedulingError::BookingNotFound(id))
    }

    fn bookings_for_provider(&self, provider_id: &str) -> Result<Vec<Booking>> {
        let data = self.read()?;
        let mut bookings: Vec<_> = data
            .bookings
            .iter()
            .filter(|b| b.provider_id == provider_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.scheduled_date, b.scheduled_time));
        Ok(bookings)
    }

    fn bookings_for_client(&self, client_id: &str) -> Result<Vec<Booking>> {
        let data = self.read()?;
        let mut bookings: Vec<_> = data
            .bookings
            .iter()
            .filter(|b| b.client_id == client_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.scheduled_date, b.scheduled_time));
        Ok(bookings)
    }

    fn update_booking(&self, booking: &Booking) -> Result<()> {
        let mut data = self.write()?;
        if let Some(collision) = find_collision(&data.bookings, std::slice::from_ref(booking)) {
            return Err(slot_taken(collision));
        }
        let slot = data
            .bookings
            .iter_mut()
            .find(|b| b.id == booking.id)
            .ok_or(SchedulingError::BookingNotFound(booking.id))?;
        *slot = booking.clone();
        Ok(())
    }
}
