// Booking confirmation routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use boxoffice_core::service::ConfirmBooking;
use boxoffice_core::store::ReservationStore;
use boxoffice_core::{Booking, BookingService};

use crate::common::{error_response, ApiError};

/// App state for booking routes
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            bookings: Arc::new(BookingService::new(store)),
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/bookings/confirm", post(confirm_booking))
        .route("/v1/bookings/:lock_id/confirm", post(confirm_booking_by_path))
        .with_state(state)
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBookingRequest {
    pub lock_id: Uuid,
    pub idempotency_key: Option<String>,
}

/// POST /v1/bookings/confirm - Convert a live seat lock into a booking
#[utoipa::path(
    post,
    path = "/v1/bookings/confirm",
    request_body = ConfirmBookingRequest,
    responses(
        (status = 201, description = "Booking created, payment pending", body = Booking),
        (status = 200, description = "Idempotent replay", body = Booking),
        (status = 404, description = "Lock or event not found", body = crate::common::ErrorBody),
        (status = 409, description = "Lock expired or already used", body = crate::common::ErrorBody)
    ),
    tag = "bookings"
)]
pub async fn confirm_booking(
    State(state): State<AppState>,
    Json(req): Json<ConfirmBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    confirm(state, req.lock_id, req.idempotency_key).await
}

/// POST /v1/bookings/{lock_id}/confirm - Path variant of booking confirmation
#[utoipa::path(
    post,
    path = "/v1/bookings/{lock_id}/confirm",
    params(("lock_id" = Uuid, Path, description = "Seat lock ID")),
    responses(
        (status = 201, description = "Booking created, payment pending", body = Booking),
        (status = 404, description = "Lock or event not found", body = crate::common::ErrorBody),
        (status = 409, description = "Lock expired or already used", body = crate::common::ErrorBody)
    ),
    tag = "bookings"
)]
pub async fn confirm_booking_by_path(
    State(state): State<AppState>,
    Path(lock_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    confirm(state, lock_id, None).await
}

async fn confirm(
    state: AppState,
    lock_id: Uuid,
    idempotency_key: Option<String>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let (booking, replayed) = state
        .bookings
        .confirm(ConfirmBooking {
            lock_id,
            idempotency_key,
        })
        .await
        .map_err(error_response)?;

    let status = if replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(booking)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_core::service::AcquireSeats;
    use boxoffice_core::store::CreateEvent;
    use boxoffice_core::{BookingStatus, LockService};
    use boxoffice_memory::MemoryStore;
    use chrono::{Duration, Utc};

    async fn state_with_lock(seats: i32) -> (AppState, Uuid) {
        let store: Arc<dyn ReservationStore> = Arc::new(MemoryStore::new());
        let event = store
            .create_event(CreateEvent {
                name: "Concert".into(),
                description: None,
                event_date: Utc::now() + Duration::days(3),
                total_seats: 20,
            })
            .await
            .unwrap();
        let (lock, _) = LockService::new(store.clone())
            .acquire(AcquireSeats {
                event_id: event.id,
                user_id: Some(Uuid::now_v7()),
                seats,
                idempotency_key: "k".into(),
            })
            .await
            .unwrap();
        (AppState::new(store), lock.id)
    }

    #[tokio::test]
    async fn body_variant_creates_payment_pending_booking() {
        let (state, lock_id) = state_with_lock(4).await;
        let (status, Json(booking)) = confirm_booking(
            State(state),
            Json(ConfirmBookingRequest {
                lock_id,
                idempotency_key: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(booking.status, BookingStatus::PaymentPending);
        assert_eq!(booking.seats, 4);
    }

    #[tokio::test]
    async fn path_variant_conflicts_on_second_confirmation() {
        let (state, lock_id) = state_with_lock(2).await;
        confirm_booking_by_path(State(state.clone()), Path(lock_id))
            .await
            .unwrap();
        let (status, _) = confirm_booking_by_path(State(state), Path(lock_id))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_lock_is_404() {
        let (state, _) = state_with_lock(2).await;
        let (status, _) = confirm_booking_by_path(State(state), Path(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
