// Postgres implementation of the ReservationStore trait.
//
// Atomicity strategy: the seat counter is only ever touched through
// conditional UPDATEs (the availability check and the decrement are one
// statement), and every multi-record operation runs inside one transaction.
// Status-guarded UPDATEs re-assert lifecycle legality at write time, which
// is what closes races between handlers and sweeps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use boxoffice_core::store::{AcquireLock, CreateBooking, CreateEvent, ReservationStore, SeatDrift};
use boxoffice_core::{Booking, BookingStatus, EngineError, Event, SeatLock};

use crate::models::{BookingRow, EventRow, SeatLockRow};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn db_err(e: sqlx::Error) -> EngineError {
    EngineError::Database(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a store from a connection URL.
    pub async fn from_url(database_url: &str) -> Result<Self, EngineError> {
        let pool = PgPool::connect(database_url).await.map_err(db_err)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), EngineError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }
}

/// Expire an ACTIVE lock and restore its seats (capped at `total_seats`)
/// within the caller's transaction. Shared by the release, payment-failure
/// and booking-expiry paths so the transition exists exactly once.
async fn release_lock_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    lock_id: Uuid,
) -> Result<bool, EngineError> {
    let released = sqlx::query_as::<_, (Uuid, i32)>(
        r#"
        UPDATE seat_locks
        SET status = 'EXPIRED', updated_at = NOW()
        WHERE id = $1 AND status = 'ACTIVE'
        RETURNING event_id, seats
        "#,
    )
    .bind(lock_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_err)?;

    let Some((event_id, seats)) = released else {
        return Ok(false);
    };

    sqlx::query(
        r#"
        UPDATE events
        SET available_seats = LEAST(available_seats + $2, total_seats),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(event_id)
    .bind(seats)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    Ok(true)
}

async fn booking_status_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: Uuid,
) -> Result<Option<BookingStatus>, EngineError> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?;
    match status {
        None => Ok(None),
        Some(s) => BookingStatus::parse(&s)
            .map(Some)
            .ok_or_else(|| EngineError::Database(format!("unknown booking status: {s}"))),
    }
}

#[async_trait]
impl ReservationStore for PostgresStore {
    async fn create_event(&self, input: CreateEvent) -> Result<Event, EngineError> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events (id, name, description, event_date, total_seats, available_seats)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, name, description, event_date, total_seats, available_seats,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.event_date)
        .bind(input.total_seats)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.into())
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, EngineError> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, name, description, event_date, total_seats, available_seats,
                   created_at, updated_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Event::from))
    }

    async fn list_events(&self) -> Result<Vec<Event>, EngineError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, name, description, event_date, total_seats, available_seats,
                   created_at, updated_at
            FROM events
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn find_lock_by_key(&self, key: &str) -> Result<Option<SeatLock>, EngineError> {
        let row = sqlx::query_as::<_, SeatLockRow>(
            r#"
            SELECT id, event_id, user_id, seats, status, expires_at, idempotency_key,
                   created_at, updated_at
            FROM seat_locks
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(SeatLock::try_from).transpose()
    }

    async fn get_lock(&self, id: Uuid) -> Result<Option<SeatLock>, EngineError> {
        let row = sqlx::query_as::<_, SeatLockRow>(
            r#"
            SELECT id, event_id, user_id, seats, status, expires_at, idempotency_key,
                   created_at, updated_at
            FROM seat_locks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(SeatLock::try_from).transpose()
    }

    #[instrument(skip(self, input), fields(event_id = %input.event_id, seats = input.seats))]
    async fn acquire_lock(&self, input: AcquireLock) -> Result<SeatLock, EngineError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Availability check and decrement are one conditional statement;
        // concurrent requests serialize on the row, never oversell.
        let updated = sqlx::query(
            r#"
            UPDATE events
            SET available_seats = available_seats - $2, updated_at = NOW()
            WHERE id = $1 AND available_seats >= $2
            "#,
        )
        .bind(input.event_id)
        .bind(input.seats)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
                    .bind(input.event_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(db_err)?;
            // Transaction dropped here, nothing written.
            return Err(if exists {
                EngineError::InsufficientSeats {
                    event_id: input.event_id,
                    requested: input.seats,
                }
            } else {
                EngineError::EventNotFound(input.event_id)
            });
        }

        let row = sqlx::query_as::<_, SeatLockRow>(
            r#"
            INSERT INTO seat_locks (id, event_id, user_id, seats, status, expires_at, idempotency_key)
            VALUES ($1, $2, $3, $4, 'ACTIVE', $5, $6)
            RETURNING id, event_id, user_id, seats, status, expires_at, idempotency_key,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.event_id)
        .bind(input.user_id)
        .bind(input.seats)
        .bind(input.expires_at)
        .bind(&input.idempotency_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                // A concurrent request with the same key committed first; the
                // decrement above rolls back with the transaction.
                EngineError::IdempotencyConflict
            } else {
                db_err(e)
            }
        })?;

        tx.commit().await.map_err(db_err)?;
        row.try_into()
    }

    #[instrument(skip(self))]
    async fn release_lock(&self, id: Uuid) -> Result<bool, EngineError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let released = release_lock_in_tx(&mut tx, id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(released)
    }

    async fn expired_active_locks(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SeatLock>, EngineError> {
        let rows = sqlx::query_as::<_, SeatLockRow>(
            r#"
            SELECT id, event_id, user_id, seats, status, expires_at, idempotency_key,
                   created_at, updated_at
            FROM seat_locks
            WHERE status = 'ACTIVE' AND expires_at < $1
            ORDER BY expires_at
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(SeatLock::try_from).collect()
    }

    async fn create_booking(&self, input: CreateBooking) -> Result<Booking, EngineError> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (id, user_id, event_id, seat_lock_id, seats, total_price,
                                  status, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, 'INITIATED', $7)
            RETURNING id, user_id, event_id, seat_lock_id, seats, total_price, status,
                      payment_expires_at, idempotency_key, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.user_id)
        .bind(input.event_id)
        .bind(input.seat_lock_id)
        .bind(input.seats)
        .bind(input.total_price)
        .bind(&input.idempotency_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                if db.constraint() == Some("bookings_idempotency_key_key") {
                    EngineError::IdempotencyConflict
                } else {
                    EngineError::LockAlreadyBooked(input.seat_lock_id)
                }
            }
            _ => db_err(e),
        })?;

        row.try_into()
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, EngineError> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, user_id, event_id, seat_lock_id, seats, total_price, status,
                   payment_expires_at, idempotency_key, created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Booking::try_from).transpose()
    }

    async fn find_booking_by_key(&self, key: &str) -> Result<Option<Booking>, EngineError> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, user_id, event_id, seat_lock_id, seats, total_price, status,
                   payment_expires_at, idempotency_key, created_at, updated_at
            FROM bookings
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Booking::try_from).transpose()
    }

    async fn find_booking_by_lock(&self, lock_id: Uuid) -> Result<Option<Booking>, EngineError> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, user_id, event_id, seat_lock_id, seats, total_price, status,
                   payment_expires_at, idempotency_key, created_at, updated_at
            FROM bookings
            WHERE seat_lock_id = $1
            "#,
        )
        .bind(lock_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Booking::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn open_payment_window(
        &self,
        booking_id: Uuid,
        payment_expires_at: DateTime<Utc>,
    ) -> Result<Booking, EngineError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
            SET status = 'PAYMENT_PENDING', payment_expires_at = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'INITIATED'
            RETURNING id, user_id, event_id, seat_lock_id, seats, total_price, status,
                      payment_expires_at, idempotency_key, created_at, updated_at
            "#,
        )
        .bind(booking_id)
        .bind(payment_expires_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return match booking_status_in_tx(&mut tx, booking_id).await? {
                None => Err(EngineError::BookingNotFound(booking_id)),
                Some(status) => Err(EngineError::InvalidTransition {
                    from: status,
                    to: BookingStatus::PaymentPending,
                }),
            };
        };

        tx.commit().await.map_err(db_err)?;
        row.try_into()
    }

    #[instrument(skip(self))]
    async fn settle_payment_success(&self, booking_id: Uuid) -> Result<Booking, EngineError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // The status predicate is the transition guard; it closes the race
        // with a concurrent sweep expiring the same booking.
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
            SET status = 'CONFIRMED', updated_at = NOW()
            WHERE id = $1 AND status = 'PAYMENT_PENDING'
            RETURNING id, user_id, event_id, seat_lock_id, seats, total_price, status,
                      payment_expires_at, idempotency_key, created_at, updated_at
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return match booking_status_in_tx(&mut tx, booking_id).await? {
                None => Err(EngineError::BookingNotFound(booking_id)),
                Some(status) => Err(EngineError::PaymentNotAllowed(status)),
            };
        };

        // No seat change: the seats move from held-by-lock to owned-by-booking.
        sqlx::query(
            r#"
            UPDATE seat_locks
            SET status = 'CONSUMED', updated_at = NOW()
            WHERE id = $1 AND status = 'ACTIVE'
            "#,
        )
        .bind(row.seat_lock_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        row.try_into()
    }

    #[instrument(skip(self))]
    async fn settle_payment_failure(&self, booking_id: Uuid) -> Result<Booking, EngineError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
            SET status = 'FAILED', updated_at = NOW()
            WHERE id = $1 AND status = 'PAYMENT_PENDING'
            RETURNING id, user_id, event_id, seat_lock_id, seats, total_price, status,
                      payment_expires_at, idempotency_key, created_at, updated_at
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return match booking_status_in_tx(&mut tx, booking_id).await? {
                None => Err(EngineError::BookingNotFound(booking_id)),
                Some(status) => Err(EngineError::PaymentNotAllowed(status)),
            };
        };

        release_lock_in_tx(&mut tx, row.seat_lock_id).await?;

        tx.commit().await.map_err(db_err)?;
        row.try_into()
    }

    #[instrument(skip(self))]
    async fn expire_booking(&self, booking_id: Uuid) -> Result<bool, EngineError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let expired = sqlx::query_as::<_, (Uuid,)>(
            r#"
            UPDATE bookings
            SET status = 'EXPIRED', updated_at = NOW()
            WHERE id = $1 AND status = 'PAYMENT_PENDING'
            RETURNING seat_lock_id
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some((seat_lock_id,)) = expired else {
            return Ok(false);
        };

        release_lock_in_tx(&mut tx, seat_lock_id).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn overdue_pending_bookings(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, EngineError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, user_id, event_id, seat_lock_id, seats, total_price, status,
                   payment_expires_at, idempotency_key, created_at, updated_at
            FROM bookings
            WHERE status = 'PAYMENT_PENDING' AND payment_expires_at < $1
            ORDER BY payment_expires_at
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn count_bookings_with_status(
        &self,
        status: BookingStatus,
    ) -> Result<u64, EngineError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count as u64)
    }

    async fn consumed_locks_without_confirmed_booking(
        &self,
    ) -> Result<Vec<SeatLock>, EngineError> {
        let rows = sqlx::query_as::<_, SeatLockRow>(
            r#"
            SELECT l.id, l.event_id, l.user_id, l.seats, l.status, l.expires_at,
                   l.idempotency_key, l.created_at, l.updated_at
            FROM seat_locks l
            WHERE l.status = 'CONSUMED'
              AND NOT EXISTS (
                  SELECT 1 FROM bookings b
                  WHERE b.seat_lock_id = l.id AND b.status = 'CONFIRMED'
              )
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(SeatLock::try_from).collect()
    }

    async fn seat_accounting_drift(&self) -> Result<Vec<SeatDrift>, EngineError> {
        let rows = sqlx::query_as::<_, (Uuid, i32, i32, i32)>(
            r#"
            SELECT e.id, e.total_seats, e.available_seats, COALESCE(l.held, 0)::INT
            FROM events e
            LEFT JOIN (
                SELECT event_id, SUM(seats) AS held
                FROM seat_locks
                WHERE status IN ('ACTIVE', 'CONSUMED')
                GROUP BY event_id
            ) l ON l.event_id = e.id
            WHERE e.available_seats <> e.total_seats - COALESCE(l.held, 0)
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(event_id, total_seats, available_seats, held_seats)| SeatDrift {
                event_id,
                total_seats,
                held_seats,
                available_seats,
                expected_available: total_seats - held_seats,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn correct_available_seats(
        &self,
        event_id: Uuid,
        observed: i32,
        expected: i32,
    ) -> Result<bool, EngineError> {
        // Guarded on the observed value so a legitimate concurrent mutation
        // wins over the correction.
        let updated = sqlx::query(
            r#"
            UPDATE events
            SET available_seats = $3, updated_at = NOW()
            WHERE id = $1 AND available_seats = $2
            "#,
        )
        .bind(event_id)
        .bind(observed)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() > 0 {
            return Ok(true);
        }
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        if exists {
            Ok(false)
        } else {
            Err(EngineError::EventNotFound(event_id))
        }
    }
}
