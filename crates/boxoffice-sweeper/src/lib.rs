//! Background jobs for the reservation engine.
//!
//! Two independent sweeps (stale locks, stale pending bookings) plus an
//! optional scheduled recovery pass, each on its own timer. The jobs are
//! explicitly owned: started with [`Sweeper::start`], stopped through a
//! watch-channel shutdown signal, and the underlying routines take their
//! clock as a parameter, so everything is unit-testable without timers.

mod config;
mod sweeper;

pub use config::SweeperConfig;
pub use sweeper::Sweeper;
