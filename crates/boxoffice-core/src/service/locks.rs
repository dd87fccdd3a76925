//! Lock acquisition with idempotent replay.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::SeatLock;
use crate::store::{AcquireLock, ReservationStore};

/// How long an acquired lock holds its seats before the sweeper reclaims them.
pub const DEFAULT_LOCK_WINDOW_MINUTES: i64 = 5;

/// A request to reserve `seats` seats against an event.
#[derive(Debug, Clone)]
pub struct AcquireSeats {
    pub event_id: Uuid,
    pub user_id: Option<Uuid>,
    pub seats: i32,
    pub idempotency_key: String,
}

pub struct LockService {
    store: Arc<dyn ReservationStore>,
    lock_window: Duration,
}

impl LockService {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            store,
            lock_window: Duration::minutes(DEFAULT_LOCK_WINDOW_MINUTES),
        }
    }

    pub fn with_lock_window(mut self, window: Duration) -> Self {
        self.lock_window = window;
        self
    }

    /// Acquire a seat lock. Returns the lock and whether it was a replay of
    /// an earlier request with the same idempotency key.
    ///
    /// The availability check and the decrement are one conditional update
    /// inside the store, so concurrent requests for the same event can never
    /// grant more seats than exist.
    pub async fn acquire(&self, req: AcquireSeats) -> Result<(SeatLock, bool), EngineError> {
        if req.seats <= 0 {
            return Err(EngineError::Validation(
                "seats must be a positive integer".into(),
            ));
        }
        if req.idempotency_key.trim().is_empty() {
            return Err(EngineError::Validation("idempotencyKey is required".into()));
        }

        // Replay: a retried request returns the stored lock unchanged.
        if let Some(existing) = self.store.find_lock_by_key(&req.idempotency_key).await? {
            tracing::debug!(lock_id = %existing.id, "idempotent replay of seat lock");
            return Ok((existing, true));
        }

        let input = AcquireLock {
            event_id: req.event_id,
            user_id: req.user_id,
            seats: req.seats,
            idempotency_key: req.idempotency_key.clone(),
            expires_at: Utc::now() + self.lock_window,
        };

        match self.store.acquire_lock(input).await {
            Ok(lock) => {
                tracing::info!(
                    lock_id = %lock.id,
                    event_id = %lock.event_id,
                    seats = lock.seats,
                    expires_at = %lock.expires_at,
                    "seat lock acquired"
                );
                Ok((lock, false))
            }
            // Two identical requests raced past the replay check; the loser
            // returns the winner's lock.
            Err(EngineError::IdempotencyConflict) => {
                let existing = self
                    .store
                    .find_lock_by_key(&req.idempotency_key)
                    .await?
                    .ok_or_else(|| {
                        EngineError::Database(
                            "lock missing after idempotency-key conflict".into(),
                        )
                    })?;
                Ok((existing, true))
            }
            Err(e) => Err(e),
        }
    }
}
