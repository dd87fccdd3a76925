//! Sweeper configuration.

use std::time::Duration;

/// Timer configuration for the background jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    /// How often stale ACTIVE locks are swept.
    pub lock_sweep_interval: Duration,

    /// How often overdue PAYMENT_PENDING bookings are swept.
    pub booking_sweep_interval: Duration,

    /// How often a full recovery pass runs. `None` leaves recovery to the
    /// startup pass only.
    pub recovery_interval: Option<Duration>,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            lock_sweep_interval: Duration::from_secs(60),
            booking_sweep_interval: Duration::from_secs(60),
            recovery_interval: None,
        }
    }
}

impl SweeperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables, falling back to the
    /// defaults: LOCK_SWEEP_INTERVAL_SECS, BOOKING_SWEEP_INTERVAL_SECS,
    /// RECOVERY_INTERVAL_SECS.
    pub fn from_env() -> Self {
        fn secs(var: &str) -> Option<Duration> {
            std::env::var(var)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
        }

        let defaults = Self::default();
        Self {
            lock_sweep_interval: secs("LOCK_SWEEP_INTERVAL_SECS")
                .unwrap_or(defaults.lock_sweep_interval),
            booking_sweep_interval: secs("BOOKING_SWEEP_INTERVAL_SECS")
                .unwrap_or(defaults.booking_sweep_interval),
            recovery_interval: secs("RECOVERY_INTERVAL_SECS"),
        }
    }

    pub fn with_lock_sweep_interval(mut self, interval: Duration) -> Self {
        self.lock_sweep_interval = interval;
        self
    }

    pub fn with_booking_sweep_interval(mut self, interval: Duration) -> Self {
        self.booking_sweep_interval = interval;
        self
    }

    pub fn with_recovery_interval(mut self, interval: Duration) -> Self {
        self.recovery_interval = Some(interval);
        self
    }
}
