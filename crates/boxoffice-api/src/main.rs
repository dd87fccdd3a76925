// Boxoffice API server
// Seat locks, bookings and simulated payments over a Postgres-backed engine.
// Startup order matters: recovery runs before the server accepts traffic,
// so drift left by a crash is repaired before new reservations land on it.

mod bookings;
mod common;
mod events;
mod locks;
mod payments;

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use boxoffice_core::store::ReservationStore;
use boxoffice_core::{run_recovery, Booking, BookingStatus, Event, LockStatus, SeatLock};
use boxoffice_core::{PaymentOutcome, PaymentStatus};
use boxoffice_storage::PostgresStore;
use boxoffice_sweeper::{Sweeper, SweeperConfig};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        events::create_event,
        events::list_events,
        events::get_event,
        events::lock_seats,
        locks::create_lock,
        bookings::confirm_booking,
        bookings::confirm_booking_by_path,
        payments::create_payment_intent,
    ),
    components(
        schemas(
            Event, SeatLock, Booking, LockStatus, BookingStatus,
            PaymentOutcome, PaymentStatus,
            events::CreateEventRequest, events::LockSeatsRequest, events::LockGrantResponse,
            locks::CreateLockRequest,
            bookings::ConfirmBookingRequest,
            payments::PaymentIntentRequest, payments::PaymentIntentResponse,
            common::ErrorBody,
            common::ListResponse<Event>,
        )
    ),
    tags(
        (name = "events", description = "Event management and nested seat locking"),
        (name = "locks", description = "Seat lock endpoints"),
        (name = "bookings", description = "Booking confirmation endpoints"),
        (name = "payments", description = "Simulated payment outcomes")
    ),
    info(
        title = "Boxoffice API",
        version = "0.2.0",
        description = "Seat reservation, booking lifecycle and simulated payments",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxoffice=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("boxoffice-api starting...");

    // Initialize database
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let store = PostgresStore::from_url(&database_url)
        .await
        .context("Failed to connect to database")?;
    store.migrate().await.context("Failed to run migrations")?;
    tracing::info!("Connected to database");

    let store: Arc<dyn ReservationStore> = Arc::new(store);

    // Repair any drift a crash left behind before taking traffic.
    let report = run_recovery(store.as_ref(), Utc::now())
        .await
        .context("Startup recovery failed")?;
    tracing::info!(
        locks_expired = report.locks_expired,
        bookings_expired = report.bookings_expired,
        counters_corrected = report.counters_corrected,
        "startup recovery complete"
    );

    // Background sweeps (and optional scheduled recovery)
    let sweeper_config = SweeperConfig::from_env();
    tracing::info!(config = ?sweeper_config, "sweeper configured");
    let mut sweeper = Sweeper::new(store.clone(), sweeper_config);
    sweeper.start();

    // Create module-specific states
    let events_state = events::AppState::new(store.clone());
    let locks_state = locks::AppState::new(store.clone());
    let bookings_state = bookings::AppState::new(store.clone());
    let payments_state = payments::AppState::new(store.clone());

    // Build API routes
    let app = Router::new()
        .route("/health", get(health))
        .merge(events::routes(events_state))
        .merge(locks::routes(locks_state))
        .merge(bookings::routes(bookings_state))
        .merge(payments::routes(payments_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:9000".into());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.shutdown().await;
    tracing::info!("boxoffice-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
