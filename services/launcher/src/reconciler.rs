//! Registry reconciliation for CCIP oracles.
//!
//! The reconciler:
//! - Polls the capability registry on a fixed interval
//! - Diffs the new snapshot against the last applied one
//! - Starts oracle pairs for added DONs this node belongs to
//! - Shuts down oracle pairs for removed DONs
//!
//! It is the only writer of the DON table and of the applied snapshot. Both
//! live inside the monitor task, so no locks are involved.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ccip_id::{DonId, PeerId};
use ccip_reconcile::{
    diff, CapabilityDescriptor, DonInfo, ReconcileError, RegistryDiff, RegistryState,
};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::error::LauncherError;
use crate::home_chain::HomeChainReader;
use crate::oracle::{ActiveDon, OracleCreator};
use crate::plugin::{OcrConfig, PluginType};
use crate::registry::CapabilityRegistry;
use crate::status::{LauncherStatus, StatusRequest};

/// Result of one monitor tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// The home chain reader was unhealthy; nothing was fetched.
    Unhealthy,
    /// The registry snapshot could not be fetched.
    FetchFailed(anyhow::Error),
    /// The snapshot could not be diffed against the applied one.
    DiffFailed(ReconcileError),
    /// Applying the diff failed; the snapshot was not applied.
    ProcessFailed(LauncherError),
    /// The snapshot was fully applied.
    Reconciled {
        added: usize,
        removed: usize,
        updated: usize,
    },
}

impl TickOutcome {
    pub fn is_reconciled(&self) -> bool {
        matches!(self, Self::Reconciled { .. })
    }

    /// Returns true if the tick failed on malformed registry or home chain data.
    pub fn is_data_integrity(&self) -> bool {
        match self {
            Self::DiffFailed(_) => true,
            Self::ProcessFailed(e) => e.is_data_integrity(),
            _ => false,
        }
    }

    /// Returns true if the tick failed on an unreachable or lagging dependency.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unhealthy | Self::FetchFailed(_) => true,
            Self::ProcessFailed(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Reconciler that keeps this node's oracles aligned with the registry.
pub struct Reconciler {
    /// Capability being launched.
    capability: CapabilityDescriptor,

    /// This node's P2P id.
    peer_id: PeerId,

    registry: Arc<dyn CapabilityRegistry>,
    home_chain: Arc<dyn HomeChainReader>,
    oracles: Arc<dyn OracleCreator>,

    /// Last fully applied snapshot.
    reg_state: RegistryState,

    /// Oracle pairs of the DONs this node participates in.
    dons: HashMap<DonId, ActiveDon>,

    consecutive_failures: u32,
    last_reconciled_at: Option<DateTime<Utc>>,
}

impl Reconciler {
    /// Create a new reconciler with an empty applied snapshot.
    pub fn new(
        capability: CapabilityDescriptor,
        peer_id: PeerId,
        registry: Arc<dyn CapabilityRegistry>,
        home_chain: Arc<dyn HomeChainReader>,
        oracles: Arc<dyn OracleCreator>,
    ) -> Self {
        Self {
            capability,
            peer_id,
            registry,
            home_chain,
            oracles,
            reg_state: RegistryState::default(),
            dons: HashMap::new(),
            consecutive_failures: 0,
            last_reconciled_at: None,
        }
    }

    /// Ids of DONs with a running oracle pair, ascending.
    pub fn active_dons(&self) -> Vec<DonId> {
        let mut ids: Vec<DonId> = self.dons.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn is_active(&self, don_id: DonId) -> bool {
        self.dons.contains_key(&don_id)
    }

    /// Last fully applied snapshot.
    pub fn registry_state(&self) -> &RegistryState {
        &self.reg_state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn status(&self) -> LauncherStatus {
        LauncherStatus {
            active_dons: self.active_dons(),
            last_reconciled_at: self.last_reconciled_at,
            consecutive_failures: self.consecutive_failures,
        }
    }

    /// Run the monitor loop until shutdown, then hand the reconciler back.
    pub async fn run(
        mut self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
        mut status_rx: mpsc::Receiver<StatusRequest>,
    ) -> Self {
        info!(
            capability = %self.capability,
            peer_id = %self.peer_id,
            interval_secs = interval.as_secs(),
            "Starting launcher monitor"
        );

        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                Some(request) = status_rx.recv() => {
                    let _ = request.reply_to.send(self.status());
                }
                res = shutdown.changed() => {
                    // A dropped sender means the owning launcher is gone.
                    if res.is_err() || *shutdown.borrow() {
                        info!("Launcher monitor shutting down");
                        break;
                    }
                }
            }
        }

        self
    }

    /// Perform a single reconciliation pass.
    #[instrument(skip(self), fields(capability = %self.capability))]
    pub async fn tick(&mut self) -> TickOutcome {
        let outcome = self.reconcile().await;

        match &outcome {
            TickOutcome::Reconciled {
                added,
                removed,
                updated,
            } => {
                self.consecutive_failures = 0;
                self.last_reconciled_at = Some(Utc::now());
                if added + removed > 0 {
                    info!(
                        added,
                        removed,
                        updated,
                        active_dons = self.dons.len(),
                        "Applied registry changes"
                    );
                }
            }
            failed => {
                self.consecutive_failures += 1;
                let failures = self.consecutive_failures;
                let data_integrity = failed.is_data_integrity();
                // Only transient failures get the grace period.
                if failed.is_transient() && failures <= 3 {
                    warn!(
                        outcome = ?failed,
                        consecutive_failures = failures,
                        "Reconciliation did not complete, will retry"
                    );
                } else {
                    error!(
                        outcome = ?failed,
                        data_integrity,
                        consecutive_failures = failures,
                        "Reconciliation failed"
                    );
                }
            }
        }

        outcome
    }

    async fn reconcile(&mut self) -> TickOutcome {
        if !self.home_chain.is_healthy() {
            return TickOutcome::Unhealthy;
        }

        let latest = match self.registry.latest_state().await {
            Ok(state) => state,
            Err(e) => return TickOutcome::FetchFailed(e),
        };

        let d = match diff(
            &self.capability.labelled_name,
            &self.capability.version,
            &self.reg_state,
            &latest,
        ) {
            Ok(d) => d,
            Err(e) => return TickOutcome::DiffFailed(e),
        };

        if let Err(e) = self.process_diff(&d).await {
            return TickOutcome::ProcessFailed(e);
        }

        self.reg_state = latest;
        TickOutcome::Reconciled {
            added: d.added.len(),
            removed: d.removed.len(),
            updated: d.updated.len(),
        }
    }

    /// Apply a diff: removals first, then additions.
    ///
    /// Stops at the first failing addition. DONs started before the failure
    /// stay tracked, so re-applying the same diff only retries the rest.
    pub async fn process_diff(&mut self, d: &RegistryDiff) -> Result<(), LauncherError> {
        for don_id in d.removed.keys() {
            self.remove_don(*don_id).await;
        }

        for (don_id, don) in &d.added {
            self.add_don(*don_id, don).await?;
        }

        for don_id in d.updated.keys() {
            debug!(%don_id, "DON updated in registry, no action taken");
        }

        Ok(())
    }

    async fn remove_don(&mut self, don_id: DonId) {
        let Some(active) = self.dons.remove(&don_id) else {
            debug!(%don_id, "Removed DON was not active, nothing to shut down");
            return;
        };

        let failures = active.shutdown(don_id).await;
        if failures == 0 {
            info!(%don_id, "Shut down oracles for removed DON");
        } else {
            warn!(%don_id, failures, "Shut down oracles for removed DON with errors");
        }
    }

    async fn add_don(&mut self, don_id: DonId, don: &DonInfo) -> Result<(), LauncherError> {
        if !don.has_member(&self.peer_id) {
            debug!(%don_id, "Not a member of added DON, skipping");
            return Ok(());
        }

        if self.dons.contains_key(&don_id) {
            debug!(%don_id, "DON already active, skipping");
            return Ok(());
        }

        let commit_config = self.single_ocr_config(don_id, PluginType::Commit).await?;
        let exec_config = self.single_ocr_config(don_id, PluginType::Exec).await?;

        let commit = self
            .oracles
            .create_commit_oracle(don_id, &commit_config)
            .await?;

        let exec = match self.oracles.create_exec_oracle(don_id, &exec_config).await {
            Ok(exec) => exec,
            Err(e) => {
                if let Err(shutdown_err) = commit.shutdown().await {
                    warn!(
                        %don_id,
                        error = %shutdown_err,
                        "Failed to shut down commit oracle after exec failure"
                    );
                }
                return Err(e);
            }
        };

        self.dons.insert(don_id, ActiveDon { commit, exec });
        info!(%don_id, members = don.node_p2p_ids.len(), "Started oracles for added DON");
        Ok(())
    }

    async fn single_ocr_config(
        &self,
        don_id: DonId,
        plugin_type: PluginType,
    ) -> Result<OcrConfig, LauncherError> {
        let mut configs = self
            .home_chain
            .get_ocr_configs(don_id, plugin_type)
            .await
            .map_err(|source| LauncherError::OcrConfigFetch {
                don_id,
                plugin_type,
                source,
            })?;

        if configs.len() != 1 {
            return Err(LauncherError::InvalidOcrConfigCount {
                don_id,
                plugin_type,
                count: configs.len(),
            });
        }

        configs.pop().ok_or(LauncherError::InvalidOcrConfigCount {
            don_id,
            plugin_type,
            count: 0,
        })
    }
}
