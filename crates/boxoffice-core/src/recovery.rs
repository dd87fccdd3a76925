//! Startup/periodic recovery from partial failures.
//!
//! Repairs the drift a crash between related writes can leave behind, and
//! re-asserts the seat-accounting invariant: for every event,
//! `available_seats + Σ seats(ACTIVE|CONSUMED locks) = total_seats`.
//! Every repair is logged with the deviation observed and the correction
//! applied; nothing is swallowed. Safe to run at any time.

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::model::BookingStatus;
use crate::store::ReservationStore;
use crate::sweep::{sweep_expired_locks, sweep_overdue_bookings};

/// What a recovery pass found and fixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// CONSUMED locks with no CONFIRMED booking (diagnostic only).
    pub orphaned_consumed_locks: usize,
    /// Stale ACTIVE locks expired, seats restored.
    pub locks_expired: usize,
    /// Stale PAYMENT_PENDING bookings expired, locks released.
    pub bookings_expired: usize,
    /// Event counters overwritten to match the lock ledger.
    pub counters_corrected: usize,
    /// Bookings still INITIATED (diagnostic only, no action).
    pub initiated_bookings: u64,
}

/// Run a full recovery pass.
pub async fn run_recovery(
    store: &dyn ReservationStore,
    now: DateTime<Utc>,
) -> Result<RecoveryReport, EngineError> {
    let mut report = RecoveryReport::default();

    // Step 1: CONSUMED locks without a CONFIRMED booking indicate a
    // partially applied payment-success scope. Reported, not repaired: the
    // seats are held either way and the counter step below stays truthful.
    let orphaned = store.consumed_locks_without_confirmed_booking().await?;
    report.orphaned_consumed_locks = orphaned.len();
    for lock in &orphaned {
        tracing::warn!(
            lock_id = %lock.id,
            event_id = %lock.event_id,
            seats = lock.seats,
            "CONSUMED lock has no CONFIRMED booking"
        );
    }

    // Step 2: expire overdue ACTIVE locks (covers sweeper downtime).
    let locks = sweep_expired_locks(store, now).await?;
    report.locks_expired = locks.expired;

    // Step 3: expire overdue PAYMENT_PENDING bookings, releasing their locks.
    let bookings = sweep_overdue_bookings(store, now).await?;
    report.bookings_expired = bookings.expired;

    // Step 4: authoritative counter repair. The correction is guarded on the
    // observed value so a legitimate concurrent mutation is never clobbered;
    // anything missed lands in the next pass.
    let drift = store.seat_accounting_drift().await?;
    for d in drift {
        tracing::warn!(
            event_id = %d.event_id,
            available = d.available_seats,
            expected = d.expected_available,
            held = d.held_seats,
            total = d.total_seats,
            "seat accounting drift detected"
        );
        let corrected = store
            .correct_available_seats(d.event_id, d.available_seats, d.expected_available)
            .await?;
        if corrected {
            report.counters_corrected += 1;
            tracing::info!(
                event_id = %d.event_id,
                available_seats = d.expected_available,
                "corrected available seats"
            );
        } else {
            tracing::info!(
                event_id = %d.event_id,
                "counter moved concurrently, correction deferred to next pass"
            );
        }
    }

    // Step 5: strays that never reached PAYMENT_PENDING hold no seats beyond
    // their lock (handled above); surfaced for diagnosis only.
    report.initiated_bookings = store
        .count_bookings_with_status(BookingStatus::Initiated)
        .await?;
    if report.initiated_bookings > 0 {
        tracing::info!(
            count = report.initiated_bookings,
            "bookings still INITIATED (no action taken)"
        );
    }

    tracing::info!(
        orphaned_consumed_locks = report.orphaned_consumed_locks,
        locks_expired = report.locks_expired,
        bookings_expired = report.bookings_expired,
        counters_corrected = report.counters_corrected,
        "recovery pass complete"
    );
    Ok(report)
}
