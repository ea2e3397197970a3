//! CCIP oracle lifecycle.
//!
//! A DON the node belongs to runs exactly two oracles: commit and exec.
//! [`ActiveDon`] holds both, so a DON can never be tracked with only one.
//!
//! - `config_tracker`: serves pushed configs to the OCR library
//! - `digester`: CCIP config digest computation
//! - `factory`: builds oracles from home chain OCR configs

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ccip_id::DonId;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::LauncherError;
use crate::ocr::{ContractConfig, Oracle};
use crate::plugin::{OcrConfig, PluginType};
use crate::relay::PluginProvider;

mod config_tracker;
mod digester;
mod factory;

pub use config_tracker::ConfigTracker;
pub use digester::{OffchainConfigDigester, CCIP_MULTICHAIN_DIGEST_PREFIX};
pub use factory::{JobInfo, OracleFactory};

/// A started oracle together with the resources it owns.
pub struct CcipOracle {
    plugin_type: PluginType,
    oracle: Box<dyn Oracle>,
    provider: Arc<dyn PluginProvider>,
    config_tx: watch::Sender<ContractConfig>,
}

impl CcipOracle {
    pub fn new(
        plugin_type: PluginType,
        oracle: Box<dyn Oracle>,
        provider: Arc<dyn PluginProvider>,
        config_tx: watch::Sender<ContractConfig>,
    ) -> Self {
        Self {
            plugin_type,
            oracle,
            provider,
            config_tx,
        }
    }

    pub fn plugin_type(&self) -> PluginType {
        self.plugin_type
    }

    /// Config currently served to the oracle.
    pub fn current_config(&self) -> ContractConfig {
        self.config_tx.borrow().clone()
    }

    /// Serve a new config to the oracle's tracker.
    pub fn push_config(&self, config: ContractConfig) {
        self.config_tx.send_replace(config);
    }

    /// Close the oracle, then its plugin provider.
    ///
    /// The provider is closed even when the oracle fails to close; the first
    /// error is returned.
    pub async fn shutdown(self) -> Result<()> {
        let oracle_result = self.oracle.close().await;
        let provider_result = self.provider.close().await;
        debug!(plugin_type = %self.plugin_type, "Oracle shut down");
        oracle_result.and(provider_result)
    }
}

impl std::fmt::Debug for CcipOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CcipOracle")
            .field("plugin_type", &self.plugin_type)
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

/// The oracle pair of a DON this node participates in.
#[derive(Debug)]
pub struct ActiveDon {
    pub commit: CcipOracle,
    pub exec: CcipOracle,
}

impl ActiveDon {
    /// Shut down both oracles. Failures are logged and do not stop the
    /// other oracle from being shut down.
    pub async fn shutdown(self, don_id: DonId) -> usize {
        let mut failures = 0;
        for oracle in [self.commit, self.exec] {
            let plugin_type = oracle.plugin_type();
            if let Err(e) = oracle.shutdown().await {
                failures += 1;
                warn!(%don_id, %plugin_type, error = %e, "Failed to shut down oracle");
            }
        }
        failures
    }
}

/// Builds started oracles from home chain OCR configs.
#[async_trait]
pub trait OracleCreator: Send + Sync {
    /// Create and start an oracle for `config`.
    async fn create_oracle(
        &self,
        don_id: DonId,
        config: &OcrConfig,
    ) -> Result<CcipOracle, LauncherError>;

    async fn create_commit_oracle(
        &self,
        don_id: DonId,
        config: &OcrConfig,
    ) -> Result<CcipOracle, LauncherError> {
        check_plugin_type(PluginType::Commit, config)?;
        self.create_oracle(don_id, config).await
    }

    async fn create_exec_oracle(
        &self,
        don_id: DonId,
        config: &OcrConfig,
    ) -> Result<CcipOracle, LauncherError> {
        check_plugin_type(PluginType::Exec, config)?;
        self.create_oracle(don_id, config).await
    }
}

fn check_plugin_type(expected: PluginType, config: &OcrConfig) -> Result<(), LauncherError> {
    if config.plugin_type != expected {
        return Err(LauncherError::PluginTypeMismatch {
            expected,
            actual: config.plugin_type,
        });
    }
    Ok(())
}
