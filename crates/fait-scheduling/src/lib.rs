//! # fait-scheduling
//!
//! Scheduling core of the FAIT Co-Op home-services marketplace.
//!
//! Service agents publish availability as weekly rules ("every Monday,
//! 09:00-17:00") and date-ranged rules ("June 10-12, 14:00-18:00"). Clients
//! pick from the bookable slots those rules resolve to, and the booking flow
//! re-checks every pick against the store before writing it.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use fait_scheduling::{resolve, RecurringAvailabilityRule};
//!
//! let monday = RecurringAvailabilityRule {
//!     provider_id: "agent-1".to_string(),
//!     day_of_week: 1,
//!     start_time: "09:00".to_string(),
//!     end_time: "10:00".to_string(),
//! };
//! let start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
//!
//! let days = resolve("agent-1", start, 7, &[monday], &[], 30);
//! assert_eq!(days.len(), 1);
//! assert_eq!(days[0].times[0].to_string(), "09:00");
//! assert_eq!(days[0].times[1].to_string(), "09:30");
//! ```
//!
//! ## Modules
//!
//! - [`resolver`] — availability rules → bookable slots
//! - [`rules`] — weekly and date-ranged rule types, blackout dates, validation
//! - [`time`] — `ClockTime`, a zero-padded `HH:MM` time of day
//! - [`recurrence`] — dates of recurring booking series
//! - [`booking`] — booking records and statuses
//! - [`store`] — persistence traits
//! - [`memory`] — JSON-backed in-memory store
//! - [`data_file`] — cross-process lock around a data file
//! - [`service`] — booking flow over a store
//! - [`config`] — TOML configuration
//! - [`error`] — Error types

pub mod booking;
pub mod config;
pub mod data_file;
pub mod error;
pub mod memory;
pub mod recurrence;
pub mod resolver;
pub mod rules;
pub mod service;
pub mod store;
pub mod time;

pub use booking::{Booking, BookingRequest, BookingStatus, PaymentStatus};
pub use config::SchedulingConfig;
pub use data_file::DataFile;
pub use error::SchedulingError;
pub use memory::{InMemoryStore, StoreSnapshot};
pub use recurrence::{future_dates, RecurrenceType, MAX_SERIES_OCCURRENCES};
pub use resolver::{
    flatten_slots, is_slot_available, resolve, resolve_with_exclusions, DaySlots, ResolvedSlot,
};
pub use rules::{DateRangeAvailabilityRule, RecurringAvailabilityRule, UnavailableDate};
pub use service::BookingService;
pub use store::{AvailabilityStore, BookingStore};
pub use time::ClockTime;
