// Common DTOs and error mapping for the public API

use axum::http::StatusCode;
use axum::Json;
use boxoffice_core::EngineError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

/// Map an engine error onto the HTTP taxonomy: validation 400, not-found
/// 404, conflicts 409 (payment-state rejections surface as 400, matching
/// the payment contract), everything else a generic 500.
pub fn error_response(e: EngineError) -> ApiError {
    let status = match &e {
        EngineError::Validation(_) | EngineError::PaymentNotAllowed(_) => StatusCode::BAD_REQUEST,
        EngineError::EventNotFound(_)
        | EngineError::LockNotFound(_)
        | EngineError::BookingNotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_conflict() => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %e, "request failed");
        return (
            status,
            Json(ErrorBody {
                error: "internal server error".into(),
            }),
        );
    }

    (
        status,
        Json(ErrorBody {
            error: e.to_string(),
        }),
    )
}

/// Response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_core::BookingStatus;
    use uuid::Uuid;

    #[test]
    fn status_mapping() {
        let id = Uuid::now_v7();
        let cases = [
            (EngineError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (EngineError::EventNotFound(id), StatusCode::NOT_FOUND),
            (EngineError::LockNotFound(id), StatusCode::NOT_FOUND),
            (EngineError::BookingNotFound(id), StatusCode::NOT_FOUND),
            (
                EngineError::InsufficientSeats { event_id: id, requested: 3 },
                StatusCode::CONFLICT,
            ),
            (EngineError::LockExpired(id), StatusCode::CONFLICT),
            (EngineError::LockAlreadyBooked(id), StatusCode::CONFLICT),
            (
                EngineError::PaymentNotAllowed(BookingStatus::Confirmed),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::Database("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let (status, _) = error_response(err);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let (_, Json(body)) = error_response(EngineError::Database("secret dsn".into()));
        assert_eq!(body.error, "internal server error");
    }
}
