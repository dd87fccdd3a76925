// Database rows (internal, converted to the core domain types)

use boxoffice_core::{Booking, BookingStatus, EngineError, Event, LockStatus, SeatLock};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            description: row.description,
            event_date: row.event_date,
            total_seats: row.total_seats,
            available_seats: row.available_seats,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SeatLockRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Option<Uuid>,
    pub seats: i32,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SeatLockRow> for SeatLock {
    type Error = EngineError;

    fn try_from(row: SeatLockRow) -> Result<Self, Self::Error> {
        let status = LockStatus::parse(&row.status)
            .ok_or_else(|| EngineError::Database(format!("unknown lock status: {}", row.status)))?;
        Ok(SeatLock {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            seats: row.seats,
            status,
            expires_at: row.expires_at,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub event_id: Uuid,
    pub seat_lock_id: Uuid,
    pub seats: i32,
    pub total_price: i64,
    pub status: String,
    pub payment_expires_at: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = EngineError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&row.status).ok_or_else(|| {
            EngineError::Database(format!("unknown booking status: {}", row.status))
        })?;
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            event_id: row.event_id,
            seat_lock_id: row.seat_lock_id,
            seats: row.seats,
            total_price: row.total_price,
            status,
            payment_expires_at: row.payment_expires_at,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
