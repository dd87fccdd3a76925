//! Storage seam for the reservation engine.
//!
//! Operations that touch more than one record (acquire, settle, expire)
//! are deliberately coarse: each one is a single atomic scope inside the
//! implementation, so a crash can never land between the counter update
//! and the record write it belongs to. Status-guarded transitions take the
//! place of in-process locking; the guard is evaluated by the store at the
//! moment of mutation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{Booking, BookingStatus, Event, SeatLock};

/// Input for event creation.
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub name: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub total_seats: i32,
}

/// Input for lock acquisition. `expires_at` is computed by the caller from
/// its clock and lock window, keeping the store clock-free.
#[derive(Debug, Clone)]
pub struct AcquireLock {
    pub event_id: Uuid,
    pub user_id: Option<Uuid>,
    pub seats: i32,
    pub idempotency_key: String,
    pub expires_at: DateTime<Utc>,
}

/// Input for booking creation. Bookings are inserted INITIATED and moved to
/// PAYMENT_PENDING through [`ReservationStore::open_payment_window`].
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub user_id: Option<Uuid>,
    pub event_id: Uuid,
    pub seat_lock_id: Uuid,
    pub seats: i32,
    pub total_price: i64,
    pub idempotency_key: Option<String>,
}

/// An event whose stored counter disagrees with its lock ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatDrift {
    pub event_id: Uuid,
    pub total_seats: i32,
    /// Seats held by ACTIVE and CONSUMED locks.
    pub held_seats: i32,
    /// The stored (wrong) counter value.
    pub available_seats: i32,
    /// `total_seats - held_seats`.
    pub expected_available: i32,
}

/// Durable store for events, seat locks and bookings.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    // ---- events ----

    async fn create_event(&self, input: CreateEvent) -> Result<Event, EngineError>;

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, EngineError>;

    async fn list_events(&self) -> Result<Vec<Event>, EngineError>;

    // ---- seat locks ----

    async fn find_lock_by_key(&self, key: &str) -> Result<Option<SeatLock>, EngineError>;

    async fn get_lock(&self, id: Uuid) -> Result<Option<SeatLock>, EngineError>;

    /// Conditionally decrement the event's `available_seats` and insert an
    /// ACTIVE lock, both in one atomic scope. The decrement must be a
    /// compare-and-swap (`available_seats >= seats`), never read-then-write.
    ///
    /// Errors: [`EngineError::EventNotFound`], [`EngineError::InsufficientSeats`],
    /// [`EngineError::IdempotencyConflict`] when a concurrent request with the
    /// same key committed first.
    async fn acquire_lock(&self, input: AcquireLock) -> Result<SeatLock, EngineError>;

    /// Expire an ACTIVE lock and restore its seats to the event (capped at
    /// `total_seats`), atomically and keyed on the ACTIVE predicate.
    /// Returns `false` without touching anything when the lock is missing or
    /// no longer ACTIVE, so repeated calls can never double-restore.
    async fn release_lock(&self, id: Uuid) -> Result<bool, EngineError>;

    /// ACTIVE locks whose `expires_at` has passed.
    async fn expired_active_locks(&self, now: DateTime<Utc>) -> Result<Vec<SeatLock>, EngineError>;

    // ---- bookings ----

    async fn create_booking(&self, input: CreateBooking) -> Result<Booking, EngineError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, EngineError>;

    async fn find_booking_by_key(&self, key: &str) -> Result<Option<Booking>, EngineError>;

    async fn find_booking_by_lock(&self, lock_id: Uuid) -> Result<Option<Booking>, EngineError>;

    /// Guarded INITIATED -> PAYMENT_PENDING transition, setting
    /// `payment_expires_at`. Fails with [`EngineError::InvalidTransition`]
    /// when the booking left INITIATED in the meantime.
    async fn open_payment_window(
        &self,
        booking_id: Uuid,
        payment_expires_at: DateTime<Utc>,
    ) -> Result<Booking, EngineError>;

    /// Payment success: booking PAYMENT_PENDING -> CONFIRMED and its lock
    /// ACTIVE -> CONSUMED, one atomic scope, no seat change. Fails with
    /// [`EngineError::PaymentNotAllowed`] when the booking is not
    /// PAYMENT_PENDING at write time.
    async fn settle_payment_success(&self, booking_id: Uuid) -> Result<Booking, EngineError>;

    /// Payment failure: booking PAYMENT_PENDING -> FAILED, lock ACTIVE ->
    /// EXPIRED and its seats restored (capped at `total_seats`), one atomic
    /// scope. The seat restoration shares the release semantics of
    /// [`ReservationStore::release_lock`].
    async fn settle_payment_failure(&self, booking_id: Uuid) -> Result<Booking, EngineError>;

    /// Sweep path: booking PAYMENT_PENDING -> EXPIRED and, if its lock is
    /// still ACTIVE, release it. Returns `false` when the booking is no
    /// longer PAYMENT_PENDING.
    async fn expire_booking(&self, booking_id: Uuid) -> Result<bool, EngineError>;

    /// PAYMENT_PENDING bookings whose `payment_expires_at` has passed.
    async fn overdue_pending_bookings(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, EngineError>;

    async fn count_bookings_with_status(
        &self,
        status: BookingStatus,
    ) -> Result<u64, EngineError>;

    // ---- recovery support ----

    /// CONSUMED locks with no matching CONFIRMED booking. These indicate a
    /// partially applied payment-success scope and are reported, not repaired.
    async fn consumed_locks_without_confirmed_booking(
        &self,
    ) -> Result<Vec<SeatLock>, EngineError>;

    /// Events whose `available_seats` differs from
    /// `total_seats - Σ seats(ACTIVE|CONSUMED locks)`.
    async fn seat_accounting_drift(&self) -> Result<Vec<SeatDrift>, EngineError>;

    /// Overwrite `available_seats` with `expected`, guarded on the counter
    /// still holding `observed` (a legitimate concurrent mutation must not be
    /// clobbered). Returns `false` when the guard fails.
    async fn correct_available_seats(
        &self,
        event_id: Uuid,
        observed: i32,
        expected: i32,
    ) -> Result<bool, EngineError>;
}
