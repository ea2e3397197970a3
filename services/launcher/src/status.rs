//! Status queries into the running monitor task.
//!
//! The monitor task owns the DON table. Callers never lock it; they send a
//! request and the task answers between ticks.

use ccip_id::DonId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::error::LauncherError;

/// Snapshot of the launcher's view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LauncherStatus {
    /// DONs with a running oracle pair, in ascending id order.
    pub active_dons: Vec<DonId>,
    /// When the registry snapshot was last fully applied.
    pub last_reconciled_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

/// A status request with its reply channel.
#[derive(Debug)]
pub struct StatusRequest {
    pub reply_to: oneshot::Sender<LauncherStatus>,
}

/// Cloneable handle for querying a running launcher.
#[derive(Debug, Clone)]
pub struct LauncherHandle {
    tx: mpsc::Sender<StatusRequest>,
}

impl LauncherHandle {
    pub(crate) fn new(tx: mpsc::Sender<StatusRequest>) -> Self {
        Self { tx }
    }

    /// Ask the monitor task for its current status.
    ///
    /// Answered between ticks, so a slow tick delays the reply.
    pub async fn status(&self) -> Result<LauncherStatus, LauncherError> {
        let (reply_to, rx) = oneshot::channel();
        self.tx
            .send(StatusRequest { reply_to })
            .await
            .map_err(|_| LauncherError::MonitorStopped)?;
        rx.await.map_err(|_| LauncherError::MonitorStopped)
    }
}
