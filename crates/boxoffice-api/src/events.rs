// Event routes: creation, lookup, and the nested seat-lock endpoint

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use boxoffice_core::service::AcquireSeats;
use boxoffice_core::store::ReservationStore;
use boxoffice_core::{Event, EventService, LockService};

use crate::common::{error_response, ApiError, ListResponse};

/// App state for event routes
#[derive(Clone)]
pub struct AppState {
    pub events: Arc<EventService>,
    pub locks: Arc<LockService>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            events: Arc::new(EventService::new(store.clone())),
            locks: Arc::new(LockService::new(store)),
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", post(create_event).get(list_events))
        .route("/v1/events/:event_id", get(get_event))
        .route("/v1/events/:event_id/lock", post(lock_seats))
        .with_state(state)
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub total_seats: i32,
}

/// Request body for the nested lock endpoint. The principal is optional
/// here; the flat /v1/locks endpoint requires one.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LockSeatsRequest {
    pub seats: i32,
    pub idempotency_key: String,
    pub user_id: Option<Uuid>,
}

/// Compact grant returned by the nested lock endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LockGrantResponse {
    pub lock_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// POST /v1/events - Create a new event
#[utoipa::path(
    post,
    path = "/v1/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid input", body = crate::common::ErrorBody)
    ),
    tag = "events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = state
        .events
        .create(req.name, req.description, req.event_date, req.total_seats)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /v1/events - List events
#[utoipa::path(
    get,
    path = "/v1/events",
    responses(
        (status = 200, description = "List of events", body = ListResponse<Event>)
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Event>>, ApiError> {
    let events = state.events.list().await.map_err(error_response)?;
    Ok(Json(ListResponse::new(events)))
}

/// GET /v1/events/{event_id} - Get event by ID
#[utoipa::path(
    get,
    path = "/v1/events/{event_id}",
    params(("event_id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event found", body = Event),
        (status = 404, description = "Event not found", body = crate::common::ErrorBody)
    ),
    tag = "events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Event>, ApiError> {
    let event = state
        .events
        .get(event_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(boxoffice_core::EngineError::EventNotFound(event_id)))?;
    Ok(Json(event))
}

/// POST /v1/events/{event_id}/lock - Reserve seats against an event
#[utoipa::path(
    post,
    path = "/v1/events/{event_id}/lock",
    params(("event_id" = Uuid, Path, description = "Event ID")),
    request_body = LockSeatsRequest,
    responses(
        (status = 201, description = "Seats locked", body = LockGrantResponse),
        (status = 200, description = "Idempotent replay", body = LockGrantResponse),
        (status = 404, description = "Event not found", body = crate::common::ErrorBody),
        (status = 409, description = "Not enough seats", body = crate::common::ErrorBody)
    ),
    tag = "events"
)]
pub async fn lock_seats(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<LockSeatsRequest>,
) -> Result<(StatusCode, Json<LockGrantResponse>), ApiError> {
    let (lock, replayed) = state
        .locks
        .acquire(AcquireSeats {
            event_id,
            user_id: req.user_id,
            seats: req.seats,
            idempotency_key: req.idempotency_key,
        })
        .await
        .map_err(error_response)?;

    let status = if replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((
        status,
        Json(LockGrantResponse {
            lock_id: lock.id,
            expires_at: lock.expires_at,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_memory::MemoryStore;
    use chrono::Duration;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()))
    }

    fn event_req(total_seats: i32) -> CreateEventRequest {
        CreateEventRequest {
            name: "Concert".into(),
            description: Some("Open air".into()),
            event_date: Utc::now() + Duration::days(3),
            total_seats,
        }
    }

    #[tokio::test]
    async fn create_and_fetch_event() {
        let state = state();
        let (status, Json(event)) = create_event(State(state.clone()), Json(event_req(50)))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(event.available_seats, 50);

        let Json(fetched) = get_event(State(state), Path(event.id)).await.unwrap();
        assert_eq!(fetched.id, event.id);
    }

    #[tokio::test]
    async fn invalid_event_is_rejected() {
        let (status, _) = create_event(State(state()), Json(event_req(0)))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_event_is_404() {
        let (status, _) = get_event(State(state()), Path(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn nested_lock_grants_then_replays() {
        let state = state();
        let (_, Json(event)) = create_event(State(state.clone()), Json(event_req(10)))
            .await
            .unwrap();

        let req = LockSeatsRequest {
            seats: 4,
            idempotency_key: "once".into(),
            user_id: None,
        };
        let (status, Json(grant)) =
            lock_seats(State(state.clone()), Path(event.id), Json(req.clone()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let (status, Json(replay)) = lock_seats(State(state), Path(event.id), Json(req))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replay.lock_id, grant.lock_id);
    }

    #[tokio::test]
    async fn nested_lock_conflicts_when_sold_out() {
        let state = state();
        let (_, Json(event)) = create_event(State(state.clone()), Json(event_req(10)))
            .await
            .unwrap();

        let req = |key: &str| LockSeatsRequest {
            seats: 7,
            idempotency_key: key.into(),
            user_id: None,
        };
        lock_seats(State(state.clone()), Path(event.id), Json(req("a")))
            .await
            .unwrap();
        let (status, _) = lock_seats(State(state), Path(event.id), Json(req("b")))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
