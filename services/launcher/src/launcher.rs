//! Launcher lifecycle.
//!
//! Owns the monitor task. `start` spawns it with the [`Reconciler`] moved
//! inside; `close` signals it and takes the reconciler back once the task
//! exits.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::LauncherError;
use crate::reconciler::Reconciler;
use crate::status::LauncherHandle;

const STATUS_CHANNEL_SIZE: usize = 16;

struct Monitor {
    shutdown_tx: watch::Sender<bool>,
    handle: LauncherHandle,
    task: JoinHandle<Reconciler>,
}

/// Runs a [`Reconciler`] on a fixed interval in a background task.
pub struct Launcher {
    interval: Duration,
    reconciler: Option<Reconciler>,
    monitor: Option<Monitor>,
}

impl Launcher {
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            interval,
            reconciler: Some(reconciler),
            monitor: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.monitor.is_some()
    }

    /// Spawn the monitor task.
    pub fn start(&mut self) -> Result<(), LauncherError> {
        if self.monitor.is_some() {
            return Err(LauncherError::AlreadyStarted);
        }
        let reconciler = self.reconciler.take().ok_or(LauncherError::AlreadyStarted)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = mpsc::channel(STATUS_CHANNEL_SIZE);
        let task = tokio::spawn(reconciler.run(self.interval, shutdown_rx, status_rx));

        self.monitor = Some(Monitor {
            shutdown_tx,
            handle: LauncherHandle::new(status_tx),
            task,
        });

        info!(interval_secs = self.interval.as_secs(), "Launcher started");
        Ok(())
    }

    /// Stop the monitor task and wait for it to exit.
    ///
    /// Oracles of active DONs are left running. Closing a launcher that is not
    /// running is a no-op.
    pub async fn close(&mut self) -> Result<(), LauncherError> {
        let Some(monitor) = self.monitor.take() else {
            return Ok(());
        };

        let _ = monitor.shutdown_tx.send(true);
        let reconciler = monitor
            .task
            .await
            .map_err(|e| LauncherError::MonitorPanicked(e.to_string()))?;

        let left_running = reconciler.active_dons().len();
        if left_running > 0 {
            warn!(active_dons = left_running, "Launcher closed with oracles still running");
        } else {
            info!("Launcher closed");
        }

        self.reconciler = Some(reconciler);
        Ok(())
    }

    /// Handle for status queries against the running monitor.
    pub fn handle(&self) -> Result<LauncherHandle, LauncherError> {
        self.monitor
            .as_ref()
            .map(|m| m.handle.clone())
            .ok_or(LauncherError::MonitorStopped)
    }

    /// The reconciler, while the monitor is not running.
    pub fn reconciler(&self) -> Option<&Reconciler> {
        self.reconciler.as_ref()
    }
}

impl Drop for Launcher {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            warn!("Launcher dropped without close, stopping monitor");
            let _ = monitor.shutdown_tx.send(true);
        }
    }
}
