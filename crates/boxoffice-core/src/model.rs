//! Domain records: events, seat locks, bookings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// An event with a finite seat pool.
///
/// `total_seats` is fixed at creation; `available_seats` is the contended
/// counter and is only ever mutated through guarded increments/decrements
/// (lock acquisition, lock release, recovery correction).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Seat lock lifecycle. CONSUMED and EXPIRED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockStatus {
    Active,
    Consumed,
    Expired,
}

impl LockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockStatus::Active => "ACTIVE",
            LockStatus::Consumed => "CONSUMED",
            LockStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(LockStatus::Active),
            "CONSUMED" => Some(LockStatus::Consumed),
            "EXPIRED" => Some(LockStatus::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-bounded reservation of `seats` seats against an event.
///
/// A lock's seats are counted against its event's pool exactly as long as
/// its status is ACTIVE or CONSUMED. Expiry restores them exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeatLock {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Principal that requested the lock. The nested lock route carries no
    /// principal, so this may be absent.
    pub user_id: Option<Uuid>,
    pub seats: i32,
    pub status: LockStatus,
    pub expires_at: DateTime<Utc>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking lifecycle. CONFIRMED, FAILED, EXPIRED and CANCELLED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Initiated,
    PaymentPending,
    Confirmed,
    Failed,
    Expired,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Initiated => "INITIATED",
            BookingStatus::PaymentPending => "PAYMENT_PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Failed => "FAILED",
            BookingStatus::Expired => "EXPIRED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INITIATED" => Some(BookingStatus::Initiated),
            "PAYMENT_PENDING" => Some(BookingStatus::PaymentPending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "FAILED" => Some(BookingStatus::Failed),
            "EXPIRED" => Some(BookingStatus::Expired),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Confirmed
                | BookingStatus::Failed
                | BookingStatus::Expired
                | BookingStatus::Cancelled
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking created from a still-valid seat lock.
///
/// At most one booking exists per seat lock; the lock keeps holding the
/// seats until the payment outcome resolves it. Bookings are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub event_id: Uuid,
    pub seat_lock_id: Uuid,
    pub seats: i32,
    pub total_price: i64,
    pub status: BookingStatus,
    /// Set when the booking enters PAYMENT_PENDING.
    pub payment_expires_at: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
