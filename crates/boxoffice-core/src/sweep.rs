//! Batch expiry of stale locks and stale pending bookings.
//!
//! Each candidate is expired in its own atomic store call, so a failure
//! partway through a batch loses nothing: the untouched candidates are
//! re-selected by query on the next tick. `now` is a parameter so the
//! sweeps are deterministic under test.

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::store::ReservationStore;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates matched by the expiry query.
    pub scanned: usize,
    /// Candidates actually transitioned (a concurrent actor may have beaten
    /// the sweep to the rest).
    pub expired: usize,
    /// Candidates whose mutation errored; retried next tick.
    pub failed: usize,
}

/// Expire ACTIVE locks whose `expires_at` has passed, restoring their seats.
///
/// Idempotent: the status flip and the restoration are one atomic step keyed
/// on the ACTIVE predicate, so sweeping a lock twice cannot double-restore.
pub async fn sweep_expired_locks(
    store: &dyn ReservationStore,
    now: DateTime<Utc>,
) -> Result<SweepReport, EngineError> {
    let candidates = store.expired_active_locks(now).await?;
    let mut report = SweepReport {
        scanned: candidates.len(),
        ..SweepReport::default()
    };

    for lock in candidates {
        match store.release_lock(lock.id).await {
            Ok(true) => {
                report.expired += 1;
                tracing::info!(
                    lock_id = %lock.id,
                    event_id = %lock.event_id,
                    seats = lock.seats,
                    "expired stale seat lock, seats restored"
                );
            }
            Ok(false) => {
                // Already resolved by a payment outcome or another sweep.
                tracing::debug!(lock_id = %lock.id, "lock no longer ACTIVE, skipped");
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(lock_id = %lock.id, error = %e, "failed to expire lock");
            }
        }
    }

    Ok(report)
}

/// Expire PAYMENT_PENDING bookings whose payment deadline has passed,
/// releasing their locks through the same release step the lock sweep uses.
pub async fn sweep_overdue_bookings(
    store: &dyn ReservationStore,
    now: DateTime<Utc>,
) -> Result<SweepReport, EngineError> {
    let candidates = store.overdue_pending_bookings(now).await?;
    let mut report = SweepReport {
        scanned: candidates.len(),
        ..SweepReport::default()
    };

    for booking in candidates {
        match store.expire_booking(booking.id).await {
            Ok(true) => {
                report.expired += 1;
                tracing::info!(
                    booking_id = %booking.id,
                    lock_id = %booking.seat_lock_id,
                    "expired unpaid booking, lock released"
                );
            }
            Ok(false) => {
                tracing::debug!(booking_id = %booking.id, "booking no longer PAYMENT_PENDING, skipped");
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(booking_id = %booking.id, error = %e, "failed to expire booking");
            }
        }
    }

    Ok(report)
}
