//! In-memory adapter for the boxoffice reservation engine.
//!
//! This crate provides an in-memory implementation of the
//! `ReservationStore` trait from boxoffice-core, useful for testing and
//! development scenarios where persistence is not required.
//!
//! Every trait operation takes the single write lock for its whole
//! duration, which gives each operation the same atomicity the Postgres
//! implementation gets from transactions and conditional updates.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use boxoffice_core::store::{AcquireLock, CreateBooking, CreateEvent, ReservationStore, SeatDrift};
use boxoffice_core::{
    can_transition, Booking, BookingStatus, EngineError, Event, LockStatus, SeatLock,
};

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, Event>,
    locks: HashMap<Uuid, SeatLock>,
    bookings: HashMap<Uuid, Booking>,
}

/// Thread-safe in-memory reservation store for testing.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Test fault injection: overwrite an event's counter without any guard,
    /// simulating accounting drift for the recovery path to repair.
    pub fn force_available_seats(&self, event_id: Uuid, value: i32) {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        if let Some(event) = inner.events.get_mut(&event_id) {
            event.available_seats = value;
        }
    }

    /// Test fault injection: overwrite a lock's status without restoring
    /// seats, simulating a partially applied transaction.
    pub fn force_lock_status(&self, lock_id: Uuid, status: LockStatus) {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        if let Some(lock) = inner.locks.get_mut(&lock_id) {
            lock.status = status;
        }
    }
}

/// Expire an ACTIVE lock and restore its seats. Shared by the release,
/// payment-failure and booking-expiry paths.
fn release_lock_inner(inner: &mut Inner, lock_id: Uuid) -> bool {
    let Some(lock) = inner.locks.get_mut(&lock_id) else {
        return false;
    };
    if lock.status != LockStatus::Active {
        return false;
    }
    lock.status = LockStatus::Expired;
    lock.updated_at = Utc::now();
    let (event_id, seats) = (lock.event_id, lock.seats);
    if let Some(event) = inner.events.get_mut(&event_id) {
        event.available_seats = (event.available_seats + seats).min(event.total_seats);
        event.updated_at = Utc::now();
    }
    true
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn create_event(&self, input: CreateEvent) -> Result<Event, EngineError> {
        let now = Utc::now();
        let event = Event {
            id: Uuid::now_v7(),
            name: input.name,
            description: input.description,
            event_date: input.event_date,
            total_seats: input.total_seats,
            available_seats: input.total_seats,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.write().expect("RwLock poisoned");
        inner.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner.events.get(&id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        let mut events: Vec<_> = inner.events.values().cloned().collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn find_lock_by_key(&self, key: &str) -> Result<Option<SeatLock>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner
            .locks
            .values()
            .find(|l| l.idempotency_key == key)
            .cloned())
    }

    async fn get_lock(&self, id: Uuid) -> Result<Option<SeatLock>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner.locks.get(&id).cloned())
    }

    async fn acquire_lock(&self, input: AcquireLock) -> Result<SeatLock, EngineError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");

        if inner
            .locks
            .values()
            .any(|l| l.idempotency_key == input.idempotency_key)
        {
            return Err(EngineError::IdempotencyConflict);
        }

        let event = inner
            .events
            .get_mut(&input.event_id)
            .ok_or(EngineError::EventNotFound(input.event_id))?;
        if event.available_seats < input.seats {
            return Err(EngineError::InsufficientSeats {
                event_id: input.event_id,
                requested: input.seats,
            });
        }
        event.available_seats -= input.seats;
        event.updated_at = Utc::now();

        let now = Utc::now();
        let lock = SeatLock {
            id: Uuid::now_v7(),
            event_id: input.event_id,
            user_id: input.user_id,
            seats: input.seats,
            status: LockStatus::Active,
            expires_at: input.expires_at,
            idempotency_key: input.idempotency_key,
            created_at: now,
            updated_at: now,
        };
        inner.locks.insert(lock.id, lock.clone());
        Ok(lock)
    }

    async fn release_lock(&self, id: Uuid) -> Result<bool, EngineError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        Ok(release_lock_inner(&mut inner, id))
    }

    async fn expired_active_locks(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SeatLock>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner
            .locks
            .values()
            .filter(|l| l.status == LockStatus::Active && l.expires_at < now)
            .cloned()
            .collect())
    }

    async fn create_booking(&self, input: CreateBooking) -> Result<Booking, EngineError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");

        if inner
            .bookings
            .values()
            .any(|b| b.seat_lock_id == input.seat_lock_id)
        {
            return Err(EngineError::LockAlreadyBooked(input.seat_lock_id));
        }
        if let Some(key) = input.idempotency_key.as_deref() {
            if inner
                .bookings
                .values()
                .any(|b| b.idempotency_key.as_deref() == Some(key))
            {
                return Err(EngineError::IdempotencyConflict);
            }
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            event_id: input.event_id,
            seat_lock_id: input.seat_lock_id,
            seats: input.seats,
            total_price: input.total_price,
            status: BookingStatus::Initiated,
            payment_expires_at: None,
            idempotency_key: input.idempotency_key,
            created_at: now,
            updated_at: now,
        };
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner.bookings.get(&id).cloned())
    }

    async fn find_booking_by_key(&self, key: &str) -> Result<Option<Booking>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner
            .bookings
            .values()
            .find(|b| b.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn find_booking_by_lock(&self, lock_id: Uuid) -> Result<Option<Booking>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner
            .bookings
            .values()
            .find(|b| b.seat_lock_id == lock_id)
            .cloned())
    }

    async fn open_payment_window(
        &self,
        booking_id: Uuid,
        payment_expires_at: DateTime<Utc>,
    ) -> Result<Booking, EngineError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let booking = inner
            .bookings
            .get_mut(&booking_id)
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        if !can_transition(booking.status, BookingStatus::PaymentPending) {
            return Err(EngineError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::PaymentPending,
            });
        }
        booking.status = BookingStatus::PaymentPending;
        booking.payment_expires_at = Some(payment_expires_at);
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn settle_payment_success(&self, booking_id: Uuid) -> Result<Booking, EngineError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let booking = inner
            .bookings
            .get_mut(&booking_id)
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        if booking.status != BookingStatus::PaymentPending {
            return Err(EngineError::PaymentNotAllowed(booking.status));
        }
        booking.status = BookingStatus::Confirmed;
        booking.updated_at = Utc::now();
        let (result, lock_id) = (booking.clone(), booking.seat_lock_id);

        if let Some(lock) = inner.locks.get_mut(&lock_id) {
            if lock.status == LockStatus::Active {
                lock.status = LockStatus::Consumed;
                lock.updated_at = Utc::now();
            }
        }
        Ok(result)
    }

    async fn settle_payment_failure(&self, booking_id: Uuid) -> Result<Booking, EngineError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let booking = inner
            .bookings
            .get_mut(&booking_id)
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        if booking.status != BookingStatus::PaymentPending {
            return Err(EngineError::PaymentNotAllowed(booking.status));
        }
        booking.status = BookingStatus::Failed;
        booking.updated_at = Utc::now();
        let (result, lock_id) = (booking.clone(), booking.seat_lock_id);

        release_lock_inner(&mut inner, lock_id);
        Ok(result)
    }

    async fn expire_booking(&self, booking_id: Uuid) -> Result<bool, EngineError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let Some(booking) = inner.bookings.get_mut(&booking_id) else {
            return Ok(false);
        };
        if booking.status != BookingStatus::PaymentPending {
            return Ok(false);
        }
        booking.status = BookingStatus::Expired;
        booking.updated_at = Utc::now();
        let lock_id = booking.seat_lock_id;

        release_lock_inner(&mut inner, lock_id);
        Ok(true)
    }

    async fn overdue_pending_bookings(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner
            .bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::PaymentPending
                    && b.payment_expires_at.is_some_and(|t| t < now)
            })
            .cloned()
            .collect())
    }

    async fn count_bookings_with_status(
        &self,
        status: BookingStatus,
    ) -> Result<u64, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner.bookings.values().filter(|b| b.status == status).count() as u64)
    }

    async fn consumed_locks_without_confirmed_booking(
        &self,
    ) -> Result<Vec<SeatLock>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner
            .locks
            .values()
            .filter(|l| {
                l.status == LockStatus::Consumed
                    && !inner.bookings.values().any(|b| {
                        b.seat_lock_id == l.id && b.status == BookingStatus::Confirmed
                    })
            })
            .cloned()
            .collect())
    }

    async fn seat_accounting_drift(&self) -> Result<Vec<SeatDrift>, EngineError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        let mut drift = Vec::new();
        for event in inner.events.values() {
            let held: i32 = inner
                .locks
                .values()
                .filter(|l| {
                    l.event_id == event.id
                        && matches!(l.status, LockStatus::Active | LockStatus::Consumed)
                })
                .map(|l| l.seats)
                .sum();
            let expected = event.total_seats - held;
            if event.available_seats != expected {
                drift.push(SeatDrift {
                    event_id: event.id,
                    total_seats: event.total_seats,
                    held_seats: held,
                    available_seats: event.available_seats,
                    expected_available: expected,
                });
            }
        }
        Ok(drift)
    }

    async fn correct_available_seats(
        &self,
        event_id: Uuid,
        observed: i32,
        expected: i32,
    ) -> Result<bool, EngineError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let event = inner
            .events
            .get_mut(&event_id)
            .ok_or(EngineError::EventNotFound(event_id))?;
        if event.available_seats != observed {
            return Ok(false);
        }
        event.available_seats = expected;
        event.updated_at = Utc::now();
        Ok(true)
    }
}
