//! Relayer interface and plugin provider lookup.
//!
//! A relayer owns the chain-specific plumbing (readers, transmitters) for one
//! network. The launcher only asks it for a plugin provider per oracle.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ccip_id::ChainSelector;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LauncherError, ParseError};

/// Identity of a relay: a chain family network plus a chain id within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelayId {
    pub network: String,
    pub chain_id: String,
}

impl RelayId {
    pub fn new(network: impl Into<String>, chain_id: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            chain_id: chain_id.into(),
        }
    }

    /// Parse `network:chain_id`.
    pub fn parse(s: &str) -> Option<Self> {
        let (network, chain_id) = s.split_once(':')?;
        if network.is_empty() || chain_id.is_empty() {
            return None;
        }
        Some(Self::new(network, chain_id))
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.network, self.chain_id)
    }
}

/// Mapping from CCIP chain selectors to relay identities.
#[derive(Debug, Clone)]
pub struct ChainSelectorTable {
    entries: HashMap<ChainSelector, RelayId>,
}

impl ChainSelectorTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, selector: ChainSelector, relay: RelayId) {
        self.entries.insert(selector, relay);
    }

    pub fn resolve(&self, selector: ChainSelector) -> Result<&RelayId, LauncherError> {
        self.entries
            .get(&selector)
            .ok_or(LauncherError::UnknownChainSelector(selector))
    }

    pub fn relays(&self) -> impl Iterator<Item = &RelayId> {
        self.entries.values()
    }

    /// Parse entries of the form `selector=network:chain_id`, comma separated.
    pub fn parse_entries(&mut self, raw: &str) -> Result<(), ParseError> {
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = || ParseError::InvalidSelectorEntry(entry.to_string());
            let (selector, relay) = entry.split_once('=').ok_or_else(invalid)?;
            let selector = selector.trim();
            let selector: ChainSelector =
                selector.parse().map_err(|source| ParseError::InvalidChainSelector {
                    value: selector.to_string(),
                    source,
                })?;
            let relay = RelayId::parse(relay.trim()).ok_or_else(invalid)?;
            self.insert(selector, relay);
        }
        Ok(())
    }
}

impl Default for ChainSelectorTable {
    /// Well-known EVM selectors.
    fn default() -> Self {
        let mut table = Self::empty();
        for (selector, chain_id) in [
            (5009297550715157269u64, "1"),
            (3734403246176062136, "10"),
            (4949039107694359620, "42161"),
            (16015286601757825753, "11155111"),
            (14767482510784806043, "43113"),
            (3379446385462418246, "1337"),
        ] {
            table.insert(ChainSelector::new(selector), RelayId::new("evm", chain_id));
        }
        table
    }
}

/// Relay-level arguments for building a plugin provider.
#[derive(Debug, Clone, Serialize)]
pub struct RelayArgs {
    pub external_job_id: Uuid,
    pub job_id: i32,
    /// Address of the contract the oracle reports to.
    pub contract_id: String,
    /// True if the job was created in this process lifetime.
    pub new: bool,
    pub relay_config: serde_json::Value,
    pub provider_type: String,
}

/// Plugin-level arguments for building a plugin provider.
#[derive(Debug, Clone, Serialize)]
pub struct PluginArgs {
    pub transmitter_id: String,
    pub plugin_config: serde_json::Value,
}

/// Chain access handed to a reporting plugin.
#[async_trait]
pub trait PluginProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> String;

    /// Release chain resources held by the provider.
    async fn close(&self) -> Result<()>;
}

/// A chain relayer.
#[async_trait]
pub trait Relayer: Send + Sync {
    async fn new_plugin_provider(
        &self,
        relay_args: RelayArgs,
        plugin_args: PluginArgs,
    ) -> Result<Arc<dyn PluginProvider>>;
}

/// Lookup of running relayers.
pub trait RelayerSet: Send + Sync {
    fn get(&self, id: &RelayId) -> Option<Arc<dyn Relayer>>;
}

/// Relayers keyed by relay id.
#[derive(Default, Clone)]
pub struct Relayers {
    relayers: HashMap<RelayId, Arc<dyn Relayer>>,
}

impl Relayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: RelayId, relayer: Arc<dyn Relayer>) {
        self.relayers.insert(id, relayer);
    }

    pub fn len(&self) -> usize {
        self.relayers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relayers.is_empty()
    }
}

impl RelayerSet for Relayers {
    fn get(&self, id: &RelayId) -> Option<Arc<dyn Relayer>> {
        self.relayers.get(id).cloned()
    }
}

/// In-process relayer used until chain relayers are wired in.
pub struct LocalRelayer {
    relay_id: RelayId,
}

impl LocalRelayer {
    pub fn new(relay_id: RelayId) -> Self {
        Self { relay_id }
    }
}

#[async_trait]
impl Relayer for LocalRelayer {
    async fn new_plugin_provider(
        &self,
        relay_args: RelayArgs,
        _plugin_args: PluginArgs,
    ) -> Result<Arc<dyn PluginProvider>> {
        info!(
            relay_id = %self.relay_id,
            provider_type = %relay_args.provider_type,
            contract_id = %relay_args.contract_id,
            job_id = relay_args.job_id,
            "[LOCAL] Creating plugin provider"
        );

        Ok(Arc::new(LocalPluginProvider {
            name: format!("{}/{}", self.relay_id, relay_args.provider_type),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Provider returned by [`LocalRelayer`].
pub struct LocalPluginProvider {
    name: String,
    closed: AtomicBool,
}

impl LocalPluginProvider {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginProvider for LocalPluginProvider {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn close(&self) -> Result<()> {
        debug!(provider = %self.name, "[LOCAL] Closing plugin provider");
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
