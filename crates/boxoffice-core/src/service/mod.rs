//! Services layer for the reservation engine.
//! Services own validation and orchestration, calling the store for every
//! atomic step; they never hold state of their own.

pub mod bookings;
pub mod events;
pub mod locks;
pub mod payments;

pub use bookings::{BookingService, ConfirmBooking};
pub use events::EventService;
pub use locks::{AcquireSeats, LockService};
pub use payments::{PaymentOutcome, PaymentResult, PaymentService, PaymentStatus};
