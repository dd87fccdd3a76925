// Postgres storage layer with sqlx
//
// This crate provides the durable implementation of the core trait:
// - PostgresStore: implements ReservationStore over a PgPool

pub mod models;
pub mod postgres;

pub use postgres::PostgresStore;
