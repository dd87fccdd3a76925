//! Engine error taxonomy.

use crate::model::{BookingStatus, LockStatus};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the engine and its stores.
///
/// Validation and not-found errors are rejected before any write; conflict
/// errors come out of a failed conditional check with no partial writes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("event {0} not found")]
    EventNotFound(Uuid),

    #[error("seat lock {0} not found")]
    LockNotFound(Uuid),

    #[error("booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("not enough seats available on event {event_id} (requested {requested})")]
    InsufficientSeats { event_id: Uuid, requested: i32 },

    #[error("seat lock {0} has expired")]
    LockExpired(Uuid),

    #[error("seat lock {id} is {status}, not ACTIVE")]
    LockNotActive { id: Uuid, status: LockStatus },

    #[error("seat lock {0} already has a booking")]
    LockAlreadyBooked(Uuid),

    #[error("invalid state transition {from} -> {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("payment not allowed in {0} state")]
    PaymentNotAllowed(BookingStatus),

    /// Lost a creation race on a unique idempotency key. Callers refetch the
    /// winner's record and report a replay; this never reaches the HTTP layer.
    #[error("concurrent request with the same idempotency key won")]
    IdempotencyConflict,

    #[error("database error: {0}")]
    Database(String),
}

impl EngineError {
    /// Conflict errors map to 409-class responses.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientSeats { .. }
                | EngineError::LockExpired(_)
                | EngineError::LockNotActive { .. }
                | EngineError::LockAlreadyBooked(_)
                | EngineError::InvalidTransition { .. }
        )
    }
}
