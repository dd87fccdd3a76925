// Seat-lock routes (flat variant, principal required)

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use boxoffice_core::service::AcquireSeats;
use boxoffice_core::store::ReservationStore;
use boxoffice_core::{LockService, SeatLock};

use crate::common::{error_response, ApiError};

/// App state for lock routes
#[derive(Clone)]
pub struct AppState {
    pub locks: Arc<LockService>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            locks: Arc::new(LockService::new(store)),
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/locks", post(create_lock))
        .with_state(state)
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLockRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub seats: i32,
    pub idempotency_key: String,
}

/// POST /v1/locks - Reserve seats, returning the full lock
#[utoipa::path(
    post,
    path = "/v1/locks",
    request_body = CreateLockRequest,
    responses(
        (status = 201, description = "Seats locked", body = SeatLock),
        (status = 200, description = "Idempotent replay", body = SeatLock),
        (status = 404, description = "Event not found", body = crate::common::ErrorBody),
        (status = 409, description = "Not enough seats", body = crate::common::ErrorBody)
    ),
    tag = "locks"
)]
pub async fn create_lock(
    State(state): State<AppState>,
    Json(req): Json<CreateLockRequest>,
) -> Result<(StatusCode, Json<SeatLock>), ApiError> {
    let (lock, replayed) = state
        .locks
        .acquire(AcquireSeats {
            event_id: req.event_id,
            user_id: Some(req.user_id),
            seats: req.seats,
            idempotency_key: req.idempotency_key,
        })
        .await
        .map_err(error_response)?;

    let status = if replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(lock)))
}
