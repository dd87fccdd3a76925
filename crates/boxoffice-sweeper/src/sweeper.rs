//! Owned background jobs with graceful shutdown.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use boxoffice_core::store::ReservationStore;
use boxoffice_core::{run_recovery, sweep_expired_locks, sweep_overdue_bookings};

use crate::config::SweeperConfig;

/// Owns the sweep and recovery tasks for one store.
pub struct Sweeper {
    store: Arc<dyn ReservationStore>,
    config: SweeperConfig,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Sweeper {
    pub fn new(store: Arc<dyn ReservationStore>, config: SweeperConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            store,
            config,
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// Spawn the background tasks. Each runs until shutdown; a failing tick
    /// is logged and retried on the next one, since every sweep re-selects
    /// its candidates by query.
    pub fn start(&mut self) {
        let store = self.store.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = self.config.lock_sweep_interval;
        self.handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "lock sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match sweep_expired_locks(store.as_ref(), Utc::now()).await {
                            Ok(report) if report.scanned > 0 => info!(
                                scanned = report.scanned,
                                expired = report.expired,
                                failed = report.failed,
                                "lock sweep complete"
                            ),
                            Ok(_) => debug!("lock sweep found nothing"),
                            Err(e) => error!(error = %e, "lock sweep failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("lock sweeper stopped");
                        break;
                    }
                }
            }
        }));

        let store = self.store.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = self.config.booking_sweep_interval;
        self.handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "booking sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match sweep_overdue_bookings(store.as_ref(), Utc::now()).await {
                            Ok(report) if report.scanned > 0 => info!(
                                scanned = report.scanned,
                                expired = report.expired,
                                failed = report.failed,
                                "booking sweep complete"
                            ),
                            Ok(_) => debug!("booking sweep found nothing"),
                            Err(e) => error!(error = %e, "booking sweep failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("booking sweeper stopped");
                        break;
                    }
                }
            }
        }));

        if let Some(interval) = self.config.recovery_interval {
            let store = self.store.clone();
            let mut shutdown_rx = self.shutdown_tx.subscribe();
            self.handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                info!(interval_secs = interval.as_secs(), "scheduled recovery started");
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if let Err(e) = run_recovery(store.as_ref(), Utc::now()).await {
                                error!(error = %e, "scheduled recovery failed");
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            info!("scheduled recovery stopped");
                            break;
                        }
                    }
                }
            }));
        }
    }

    /// Signal shutdown and wait for every task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
