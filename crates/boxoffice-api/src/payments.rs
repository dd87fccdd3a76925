// Payment intent route (simulated outcomes)

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use boxoffice_core::store::ReservationStore;
use boxoffice_core::{Booking, PaymentOutcome, PaymentService, PaymentStatus};

use crate::common::{error_response, ApiError};

/// App state for payment routes
#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentService>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            payments: Arc::new(PaymentService::new(store)),
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/payments/intent", post(create_payment_intent))
        .with_state(state)
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub booking_id: Uuid,
    /// Forced outcome: success, failure or timeout.
    pub force: PaymentOutcome,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub payment_status: PaymentStatus,
    pub booking: Booking,
}

/// POST /v1/payments/intent - Apply a forced payment outcome
#[utoipa::path(
    post,
    path = "/v1/payments/intent",
    request_body = PaymentIntentRequest,
    responses(
        (status = 200, description = "Payment outcome applied", body = PaymentIntentResponse),
        (status = 400, description = "Payment not allowed in current state", body = crate::common::ErrorBody),
        (status = 404, description = "Booking not found", body = crate::common::ErrorBody)
    ),
    tag = "payments"
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(req): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let result = state
        .payments
        .apply(req.booking_id, req.force)
        .await
        .map_err(error_response)?;

    Ok(Json(PaymentIntentResponse {
        payment_status: result.status,
        booking: result.booking,
    }))
}
