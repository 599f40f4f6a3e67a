//! Error types for scheduling operations.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid availability rule: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The requested start time is not produced by the provider's availability.
    #[error("No availability for provider {provider_id} on {date} at {time}")]
    SlotUnavailable {
        provider_id: String,
        date: NaiveDate,
        time: String,
    },

    /// Another active booking already holds the slot.
    #[error("Slot {date} {time} for provider {provider_id} is already booked")]
    SlotTaken {
        provider_id: String,
        date: NaiveDate,
        time: String,
    },

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Cannot {action} a booking that is {status}")]
    InvalidTransition { action: &'static str, status: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulingError>;
