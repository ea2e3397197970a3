//! Oracle factory.
//!
//! Turns one home chain OCR config into a started [`CcipOracle`]: resolve the
//! relayer for the config's chain, get a plugin provider from it, then hand
//! the OCR library everything it needs to run the oracle.

use std::sync::Arc;

use async_trait::async_trait;
use ccip_id::DonId;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{CcipOracle, ConfigTracker, OffchainConfigDigester, OracleCreator};
use crate::error::LauncherError;
use crate::keyring::{ChainType, Keyrings};
use crate::ocr::{
    ContractConfig, LocalConfig, OcrLibrary, OcrStore, OracleArgs, PeerWrapper,
    ReportingPluginFactory,
};
use crate::plugin::OcrConfig;
use crate::relay::{ChainSelectorTable, PluginArgs, PluginProvider, RelayArgs, RelayerSet};

/// Job the oracles run under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub job_id: i32,
    pub external_job_id: Uuid,
    /// Whether the job was created in this run of the node.
    pub is_new_job: bool,
    pub transmitter_id: String,
}

/// Production [`OracleCreator`].
pub struct OracleFactory {
    peer: Arc<PeerWrapper>,
    job: JobInfo,
    relayers: Arc<dyn RelayerSet>,
    selectors: ChainSelectorTable,
    keyrings: Keyrings,
    store: OcrStore,
    ocr: Arc<dyn OcrLibrary>,
    local_config: LocalConfig,
}

impl OracleFactory {
    pub fn new(
        peer: Arc<PeerWrapper>,
        job: JobInfo,
        relayers: Arc<dyn RelayerSet>,
        store: OcrStore,
        ocr: Arc<dyn OcrLibrary>,
    ) -> Self {
        Self {
            peer,
            job,
            relayers,
            selectors: ChainSelectorTable::default(),
            keyrings: Keyrings::default(),
            store,
            ocr,
            local_config: LocalConfig::default(),
        }
    }

    pub fn with_selectors(mut self, selectors: ChainSelectorTable) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_keyrings(mut self, keyrings: Keyrings) -> Self {
        self.keyrings = keyrings;
        self
    }

    pub fn with_local_config(mut self, local_config: LocalConfig) -> Self {
        self.local_config = local_config;
        self
    }

    async fn plugin_provider(
        &self,
        config: &OcrConfig,
        chain_type: ChainType,
    ) -> Result<Arc<dyn PluginProvider>, LauncherError> {
        let relay_id = self.selectors.resolve(config.chain_selector)?;
        let relayer = self
            .relayers
            .get(relay_id)
            .ok_or_else(|| LauncherError::RelayerNotFound(relay_id.clone()))?;

        let relay_args = RelayArgs {
            external_job_id: self.job.external_job_id,
            job_id: self.job.job_id,
            contract_id: format!("0x{}", hex::encode(&config.offramp_address)),
            new: self.job.is_new_job,
            relay_config: json!({
                "chainID": relay_id.chain_id,
                "chainSelector": config.chain_selector.value(),
                "chainType": chain_type.as_str(),
            }),
            provider_type: config.plugin_type.provider_type().to_string(),
        };
        let plugin_args = PluginArgs {
            transmitter_id: self.job.transmitter_id.clone(),
            plugin_config: json!({
                "pluginType": config.plugin_type.as_u8(),
                "f": config.f,
            }),
        };

        relayer
            .new_plugin_provider(relay_args, plugin_args)
            .await
            .map_err(|source| LauncherError::PluginProvider {
                plugin_type: config.plugin_type,
                source,
            })
    }
}

#[async_trait]
impl OracleCreator for OracleFactory {
    async fn create_oracle(
        &self,
        don_id: DonId,
        config: &OcrConfig,
    ) -> Result<CcipOracle, LauncherError> {
        let plugin_type = config.plugin_type;
        let relay_id = self.selectors.resolve(config.chain_selector)?;
        let chain_type: ChainType = relay_id
            .network
            .parse()
            .map_err(|_| LauncherError::UnsupportedNetwork(relay_id.network.clone()))?;
        let (onchain_keyring, offchain_keyring) = self.keyrings.select(chain_type)?;

        let provider = self.plugin_provider(config, chain_type).await?;

        let digester =
            OffchainConfigDigester::new(config.chain_selector, config.offramp_address.clone());
        let contract_config = ContractConfig::from_ocr_config(config, &digester);
        let config_digest = contract_config.config_digest;
        let (config_tx, config_rx) = watch::channel(contract_config);

        let args = OracleArgs {
            don_id,
            plugin_type,
            network: Arc::clone(&self.peer),
            v2_bootstrappers: config.bootstrap_p2p_ids.clone(),
            contract_config_tracker: ConfigTracker::new(config_rx),
            offchain_config_digester: digester,
            database: Arc::new(self.store.scoped(self.job.job_id, plugin_type)),
            local_config: self.local_config.clone(),
            onchain_keyring,
            offchain_keyring,
            reporting_plugin_factory: ReportingPluginFactory {
                plugin_type,
                provider: Arc::clone(&provider),
            },
        };

        let oracle = match self.ocr.new_oracle(args).await {
            Ok(oracle) => oracle,
            Err(source) => {
                close_provider(&provider).await;
                return Err(LauncherError::OracleCreation {
                    plugin_type,
                    source,
                });
            }
        };

        if let Err(source) = oracle.start().await {
            if let Err(e) = oracle.close().await {
                warn!(
                    %don_id,
                    %plugin_type,
                    error = %e,
                    "Failed to close oracle after failed start"
                );
            }
            close_provider(&provider).await;
            return Err(LauncherError::OracleStart {
                plugin_type,
                source,
            });
        }

        info!(
            %don_id,
            %plugin_type,
            relay = %relay_id,
            %config_digest,
            "Started oracle"
        );

        Ok(CcipOracle::new(plugin_type, oracle, provider, config_tx))
    }
}

async fn close_provider(provider: &Arc<dyn PluginProvider>) {
    if let Err(e) = provider.close().await {
        debug!(provider = %provider.name(), error = %e, "Failed to close plugin provider");
    }
}
