//! Simulated payment outcomes.
//!
//! There is no gateway integration: the caller forces the outcome. Success
//! and failure settle synchronously; timeout leaves the booking for the
//! booking sweeper to expire once its payment deadline passes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{Booking, BookingStatus};
use crate::store::ReservationStore;

/// Forced outcome supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Success,
    Failure,
    Timeout,
}

/// What the payment attempt resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Success,
    Failed,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct PaymentResult {
    pub status: PaymentStatus,
    pub booking: Booking,
}

pub struct PaymentService {
    store: Arc<dyn ReservationStore>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Apply a forced payment outcome to a PAYMENT_PENDING booking.
    ///
    /// The status check here gives the caller a clean error; the store
    /// re-asserts it inside the settling transaction, which is what actually
    /// closes the race with a concurrent sweep.
    pub async fn apply(
        &self,
        booking_id: Uuid,
        outcome: PaymentOutcome,
    ) -> Result<PaymentResult, EngineError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(EngineError::BookingNotFound(booking_id))?;

        if booking.status != BookingStatus::PaymentPending {
            return Err(EngineError::PaymentNotAllowed(booking.status));
        }

        match outcome {
            PaymentOutcome::Timeout => {
                // No synchronous change; the sweeper expires the booking once
                // payment_expires_at passes.
                tracing::info!(booking_id = %booking.id, "payment timed out (simulated)");
                Ok(PaymentResult {
                    status: PaymentStatus::Timeout,
                    booking,
                })
            }
            PaymentOutcome::Success => {
                let booking = self.store.settle_payment_success(booking_id).await?;
                tracing::info!(booking_id = %booking.id, "payment succeeded, booking confirmed");
                Ok(PaymentResult {
                    status: PaymentStatus::Success,
                    booking,
                })
            }
            PaymentOutcome::Failure => {
                let booking = self.store.settle_payment_failure(booking_id).await?;
                tracing::info!(booking_id = %booking.id, "payment failed, seats released");
                Ok(PaymentResult {
                    status: PaymentStatus::Failed,
                    booking,
                })
            }
        }
    }
}
