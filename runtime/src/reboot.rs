//! Reboot request supervisor.
//!
//! Periodically polls a persistent key for the reboot sentinel and triggers
//! a host cold reset when it is confirmed. The timer task only requests
//! that a check run; the check itself executes on a deferred worker, since
//! the store read may block. Requests are coalesced through a bounded
//! channel of capacity one: a tick that fires while a check is still
//! pending is absorbed, never queued twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use warden_core::config::RebootConfig;
use warden_core::{EventEmitter, HostEvent};

use crate::power::HostPower;
use crate::store::SentinelStore;
use crate::REBOOT_SENTINEL;

/// Outcome of one sentinel check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckOutcome {
    Idle,
    Rebooting,
}

/// Owns the periodic check schedule and the deferred check worker.
pub struct RebootSupervisor {
    interval: Duration,
    key: String,
    store: Arc<dyn SentinelStore>,
    power: Arc<dyn HostPower>,
    events: EventEmitter,
    timer_handle: Option<JoinHandle<()>>,
    worker_handle: Option<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl RebootSupervisor {
    pub fn new(
        config: &RebootConfig,
        store: Arc<dyn SentinelStore>,
        power: Arc<dyn HostPower>,
        events: EventEmitter,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            interval: Duration::from_secs(config.check_interval_secs),
            key: config.key.clone(),
            store,
            power,
            events,
            timer_handle: None,
            worker_handle: None,
            shutdown_tx,
        }
    }

    /// Start the timer and worker tasks. A second start on a running
    /// supervisor is a no-op.
    pub fn start(&mut self) {
        if self.timer_handle.is_some() {
            return;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            key = %self.key,
            "Starting reboot watcher"
        );

        let (check_tx, check_rx) = mpsc::channel::<()>(1);

        self.timer_handle = Some(self.spawn_timer(check_tx));
        self.worker_handle = Some(self.spawn_worker(check_rx));
    }

    /// Stop both tasks and wait for them to finish.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);

        if let Some(handle) = self.timer_handle.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.await;
        }
    }

    fn spawn_timer(&self, check_tx: mpsc::Sender<()>) -> JoinHandle<()> {
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately;
            // consume it so checks start one period after boot.
            ticker.tick().await;

            loop {
                tokio::select! {
                    result = shutdown_rx.changed() => {
                        if result.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match check_tx.try_send(()) {
                            Ok(()) => {}
                            Err(TrySendError::Full(())) => {
                                tracing::trace!("Check already pending, coalescing");
                            }
                            Err(TrySendError::Closed(())) => {
                                // Worker is gone (reboot in progress).
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    fn spawn_worker(&self, mut check_rx: mpsc::Receiver<()>) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let power = Arc::clone(&self.power);
        let key = self.key.clone();
        let events = self.events.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = shutdown_rx.changed() => {
                        if result.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    request = check_rx.recv() => {
                        match request {
                            None => break,
                            Some(()) => {
                                let outcome =
                                    perform_check(store.as_ref(), power.as_ref(), &key, &events);
                                if outcome == CheckOutcome::Rebooting {
                                    // Terminal: never read the key again.
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        })
    }
}

fn perform_check(
    store: &dyn SentinelStore,
    power: &dyn HostPower,
    key: &str,
    events: &EventEmitter,
) -> CheckOutcome {
    match store.read_integer(key) {
        Ok(None) => CheckOutcome::Idle,
        Ok(Some(REBOOT_SENTINEL)) => {
            tracing::info!("Reboot request confirmed, resetting host");
            events.emit(HostEvent::empty("reboot.triggered"));
            if let Err(e) = power.cold_reset() {
                tracing::error!(error = %e, "Failed to reset host");
            }
            CheckOutcome::Rebooting
        }
        Ok(Some(value)) => {
            tracing::warn!(value, "Unexpected reboot request value");
            CheckOutcome::Idle
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read reboot request");
            CheckOutcome::Idle
        }
    }
}
