//! Seat-reservation and booking-lifecycle engine.
//!
//! The engine reserves seats out of a finite per-event pool (seat locks),
//! converts a live lock into a booking, drives the booking through a payment
//! outcome, and keeps the seat accounting honest across crashes and timeouts
//! via periodic sweeps and a recovery pass.
//!
//! Storage is abstracted behind [`ReservationStore`]; implementations must
//! provide the atomicity each operation documents (conditional decrement,
//! status-guarded transitions, multi-record scopes).

pub mod error;
pub mod model;
pub mod recovery;
pub mod service;
pub mod state;
pub mod store;
pub mod sweep;

pub use error::EngineError;
pub use model::{Booking, BookingStatus, Event, LockStatus, SeatLock};
pub use recovery::{run_recovery, RecoveryReport};
pub use service::{
    BookingService, EventService, LockService, PaymentOutcome, PaymentService, PaymentStatus,
};
pub use state::can_transition;
pub use store::{AcquireLock, CreateBooking, CreateEvent, ReservationStore, SeatDrift};
pub use sweep::{sweep_expired_locks, sweep_overdue_bookings, SweepReport};
