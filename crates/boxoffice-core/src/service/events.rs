//! Event creation and lookup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::Event;
use crate::store::{CreateEvent, ReservationStore};

pub struct EventService {
    store: Arc<dyn ReservationStore>,
}

impl EventService {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
        event_date: DateTime<Utc>,
        total_seats: i32,
    ) -> Result<Event, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::Validation("name is required".into()));
        }
        if total_seats <= 0 {
            return Err(EngineError::Validation(
                "totalSeats must be a positive integer".into(),
            ));
        }

        let event = self
            .store
            .create_event(CreateEvent {
                name,
                description,
                event_date,
                total_seats,
            })
            .await?;

        tracing::info!(event_id = %event.id, total_seats, "event created");
        Ok(event)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Event>, EngineError> {
        self.store.get_event(id).await
    }

    pub async fn list(&self) -> Result<Vec<Event>, EngineError> {
        self.store.list_events().await
    }
}
