//! OCR library surface consumed by the launcher.
//!
//! The consensus engine itself is an external dependency. This module pins
//! down what the launcher hands it ([`OracleArgs`]) and what it gets back
//! (an [`Oracle`] it can start and close).
//!
//! - `database`: persistent OCR state, scoped per job and plugin type
//! - `local`: in-process stand-in engine used until the real one is linked

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Bytes;
use anyhow::Result;
use async_trait::async_trait;
use ccip_id::{ConfigDigest, DonId, PeerId};
use serde::{Deserialize, Serialize};

use crate::keyring::{OffchainKeyring, OnchainKeyring};
use crate::oracle::{ConfigTracker, OffchainConfigDigester};
use crate::plugin::{OcrConfig, PluginType};
use crate::relay::PluginProvider;

mod database;
mod local;

pub use database::{OcrDatabase, OcrDatabaseError, OcrStore, PersistentState, SqliteOcrDatabase};
pub use local::{LocalOcr, LocalOracle};

/// A running OCR instance.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Begin participating in consensus.
    async fn start(&self) -> Result<()>;

    /// Stop participating and release resources.
    async fn close(&self) -> Result<()>;
}

/// Oracle constructor exposed by the OCR library.
///
/// Construction is all-or-nothing: an error leaves nothing running.
#[async_trait]
pub trait OcrLibrary: Send + Sync {
    async fn new_oracle(&self, args: OracleArgs) -> Result<Box<dyn Oracle>>;
}

/// Configuration as pulled by the OCR library's contract config tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub config_digest: ConfigDigest,
    pub config_count: u64,
    pub signers: Vec<Bytes>,
    pub transmitters: Vec<Bytes>,
    pub f: u8,
    pub onchain_config: Bytes,
    pub offchain_config_version: u64,
    pub offchain_config: Bytes,
}

impl ContractConfig {
    /// Build the pulled config for a home chain OCR config and stamp its digest.
    pub fn from_ocr_config(config: &OcrConfig, digester: &OffchainConfigDigester) -> Self {
        let mut contract_config = Self {
            config_digest: ConfigDigest::default(),
            config_count: config.config_count,
            signers: config.signers.clone(),
            transmitters: config.transmitters.clone(),
            f: config.f,
            onchain_config: Bytes::new(),
            offchain_config_version: config.offchain_config_version,
            offchain_config: config.offchain_config.clone(),
        };
        contract_config.config_digest = digester.config_digest(&contract_config);
        contract_config
    }
}

/// Network endpoint shared by all oracles on this node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerWrapper {
    pub peer_id: PeerId,
    pub announce_addresses: Vec<String>,
}

/// Node-local timing and behaviour knobs for an oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub blockchain_timeout: Duration,
    pub contract_config_confirmations: u16,
    pub skip_contract_config_confirmations: bool,
    pub contract_config_tracker_poll_interval: Duration,
    pub contract_transmitter_transmit_timeout: Duration,
    pub database_timeout: Duration,
    pub min_ocr2_max_duration_query: Duration,
    pub dev_mode: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            blockchain_timeout: Duration::from_secs(10),
            contract_config_confirmations: 1,
            skip_contract_config_confirmations: false,
            contract_config_tracker_poll_interval: Duration::from_secs(15),
            contract_transmitter_transmit_timeout: Duration::from_secs(10),
            database_timeout: Duration::from_secs(10),
            min_ocr2_max_duration_query: Duration::from_secs(1),
            dev_mode: false,
        }
    }
}

/// Factory for the CCIP reporting plugin run inside an oracle.
#[derive(Clone)]
pub struct ReportingPluginFactory {
    pub plugin_type: PluginType,
    pub provider: Arc<dyn PluginProvider>,
}

impl std::fmt::Debug for ReportingPluginFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportingPluginFactory")
            .field("plugin_type", &self.plugin_type)
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// Everything the OCR library needs to construct one oracle.
pub struct OracleArgs {
    pub don_id: DonId,
    pub plugin_type: PluginType,
    pub network: Arc<PeerWrapper>,
    pub v2_bootstrappers: Vec<PeerId>,
    pub contract_config_tracker: ConfigTracker,
    pub offchain_config_digester: OffchainConfigDigester,
    pub database: Arc<dyn OcrDatabase>,
    pub local_config: LocalConfig,
    pub onchain_keyring: OnchainKeyring,
    pub offchain_keyring: OffchainKeyring,
    pub reporting_plugin_factory: ReportingPluginFactory,
}
