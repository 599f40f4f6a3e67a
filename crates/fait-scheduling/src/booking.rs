//! Booking records and their status lifecycle.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::ClockTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Active bookings hold their slot.
    pub fn is_active(self) -> bool {
        self != BookingStatus::Cancelled
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

/// A client's reservation of one provider slot.
///
/// Money amounts are in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub client_id: String,
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_package_id: Option<String>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: ClockTime,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub price: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_group: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_sequence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Whether this booking occupies `provider_id`'s slot at `date` `time`.
    pub fn holds(&self, provider_id: &str, date: NaiveDate, time: ClockTime) -> bool {
        self.status.is_active()
            && self.provider_id == provider_id
            && self.scheduled_date == date
            && self.scheduled_time == time
    }
}

/// What a client submits when picking a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub client_id: String,
    pub provider_id: String,
    #[serde(default)]
    pub service_package_id: Option<String>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: ClockTime,
    pub price: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    /// A fresh pending, unpaid booking for this request.
    pub fn into_booking(self, now: DateTime<Utc>) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            client_id: self.client_id,
            provider_id: self.provider_id,
            service_package_id: self.service_package_id,
            scheduled_date: self.scheduled_date,
            scheduled_time: self.scheduled_time,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            price: self.price,
            notes: self.notes,
            is_recurring: false,
            recurrence_group: None,
            recurrence_sequence: None,
            cancellation_reason: None,
            cancelled_at: None,
            refund_amount: None,
            created_at: now,
            updated_at: now,
        }
    }
}
