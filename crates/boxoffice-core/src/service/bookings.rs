//! Booking confirmation: converting a live seat lock into a booking.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{Booking, LockStatus};
use crate::store::{CreateBooking, ReservationStore};

/// How long a booking may sit in PAYMENT_PENDING before the sweeper expires it.
pub const DEFAULT_PAYMENT_WINDOW_MINUTES: i64 = 10;

/// Placeholder pricing until a pricing engine exists.
const PRICE_PER_SEAT: i64 = 100;

#[derive(Debug, Clone)]
pub struct ConfirmBooking {
    pub lock_id: Uuid,
    pub idempotency_key: Option<String>,
}

pub struct BookingService {
    store: Arc<dyn ReservationStore>,
    payment_window: Duration,
}

impl BookingService {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            store,
            payment_window: Duration::minutes(DEFAULT_PAYMENT_WINDOW_MINUTES),
        }
    }

    pub fn with_payment_window(mut self, window: Duration) -> Self {
        self.payment_window = window;
        self
    }

    /// Confirm a booking from a still-valid ACTIVE lock. Returns the booking
    /// and whether it was an idempotent replay.
    ///
    /// Seats were deducted at lock acquisition and are NOT deducted again
    /// here. The lock stays ACTIVE until the payment outcome resolves it, so
    /// its seats remain accounted for while payment is pending.
    pub async fn confirm(&self, req: ConfirmBooking) -> Result<(Booking, bool), EngineError> {
        if let Some(key) = req.idempotency_key.as_deref() {
            if let Some(existing) = self.store.find_booking_by_key(key).await? {
                tracing::debug!(booking_id = %existing.id, "idempotent replay of booking");
                return Ok((existing, true));
            }
        }

        let lock = self
            .store
            .get_lock(req.lock_id)
            .await?
            .ok_or(EngineError::LockNotFound(req.lock_id))?;

        if lock.status != LockStatus::Active {
            return Err(EngineError::LockNotActive {
                id: lock.id,
                status: lock.status,
            });
        }

        let now = Utc::now();
        if lock.expires_at < now {
            // Reclaim the seats right away instead of waiting for the sweep.
            self.store.release_lock(lock.id).await?;
            tracing::info!(lock_id = %lock.id, "rejected confirmation of expired lock");
            return Err(EngineError::LockExpired(lock.id));
        }

        let event = self
            .store
            .get_event(lock.event_id)
            .await?
            .ok_or(EngineError::EventNotFound(lock.event_id))?;

        if self.store.find_booking_by_lock(lock.id).await?.is_some() {
            return Err(EngineError::LockAlreadyBooked(lock.id));
        }

        let booking = match self
            .store
            .create_booking(CreateBooking {
                user_id: lock.user_id,
                event_id: event.id,
                seat_lock_id: lock.id,
                seats: lock.seats,
                total_price: i64::from(lock.seats) * PRICE_PER_SEAT,
                idempotency_key: req.idempotency_key.clone(),
            })
            .await
        {
            Ok(booking) => booking,
            // Two identical confirmations raced; return the winner's booking.
            Err(EngineError::IdempotencyConflict) => {
                let key = req.idempotency_key.as_deref().unwrap_or_default();
                let existing = self.store.find_booking_by_key(key).await?.ok_or_else(|| {
                    EngineError::Database(
                        "booking missing after idempotency-key conflict".into(),
                    )
                })?;
                return Ok((existing, true));
            }
            Err(e) => return Err(e),
        };

        // The persisted state before payment must be PAYMENT_PENDING with a
        // payment deadline; the guarded transition asserts INITIATED at write
        // time.
        let booking = self
            .store
            .open_payment_window(booking.id, now + self.payment_window)
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            lock_id = %lock.id,
            event_id = %event.id,
            seats = booking.seats,
            "booking confirmed, awaiting payment"
        );
        Ok((booking, false))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Booking>, EngineError> {
        self.store.get_booking(id).await
    }
}
