//! Shared fakes for launcher integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::Bytes;
use async_trait::async_trait;
use ccip_id::{ChainSelector, DonId, PeerId};
use ccip_launcher::home_chain::HomeChainReader;
use ccip_launcher::keyring::{ChainType, Keyrings};
use ccip_launcher::ocr::{OcrLibrary, OcrStore, Oracle, OracleArgs, PeerWrapper};
use ccip_launcher::oracle::{JobInfo, OracleFactory};
use ccip_launcher::plugin::{ChainConfig, OcrConfig, PluginType};
use ccip_launcher::registry::CapabilityRegistry;
use ccip_launcher::relay::{LocalRelayer, RelayId, Relayers};
use ccip_launcher::Reconciler;
use ccip_reconcile::{CapabilityConfiguration, CapabilityDescriptor, DonInfo, RegistryState};
use uuid::Uuid;

/// Chain selector of the local test chain (evm:1337 in the default table).
pub const TEST_SELECTOR: u64 = 3379446385462418246;

pub fn peer(n: u8) -> PeerId {
    PeerId::from_bytes([n; 32])
}

pub fn ccip_capability() -> CapabilityDescriptor {
    CapabilityDescriptor::new("ccip", "v1.0.0")
}

pub fn ccip_don(id: u32, members: &[PeerId]) -> DonInfo {
    DonInfo {
        id: DonId::new(id),
        node_p2p_ids: members.iter().copied().collect::<BTreeSet<_>>(),
        capability_configurations: vec![CapabilityConfiguration {
            capability_id: ccip_capability().id(),
            config: Bytes::new(),
        }],
        f: 1,
        config_count: 1,
        is_public: false,
        accepts_workflows: false,
    }
}

pub fn registry_state(dons: Vec<DonInfo>) -> RegistryState {
    RegistryState {
        dons,
        capabilities: vec![ccip_capability()],
        nodes: vec![],
    }
}

pub fn ocr_config(plugin_type: PluginType) -> OcrConfig {
    OcrConfig {
        plugin_type,
        chain_selector: ChainSelector::new(TEST_SELECTOR),
        f: 1,
        offchain_config_version: 30,
        offramp_address: Bytes::from(vec![0x11; 20]),
        bootstrap_p2p_ids: vec![peer(9)],
        p2p_ids: vec![peer(1), peer(2), peer(3), peer(4)],
        signers: vec![Bytes::from(vec![0xaa; 20])],
        transmitters: vec![Bytes::from(vec![0xbb; 20])],
        offchain_config: Bytes::new(),
        config_count: 1,
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Registry serving a settable snapshot.
#[derive(Default)]
pub struct FakeRegistry {
    state: Mutex<RegistryState>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeRegistry {
    pub fn set_state(&self, state: RegistryState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapabilityRegistry for FakeRegistry {
    async fn latest_state(&self) -> anyhow::Result<RegistryState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("registry unavailable");
        }
        Ok(self.state.lock().unwrap().clone())
    }
}

// =============================================================================
// Home chain
// =============================================================================

/// Home chain serving settable OCR configs.
pub struct FakeHomeChain {
    healthy: AtomicBool,
    configs: Mutex<HashMap<(DonId, PluginType), Vec<OcrConfig>>>,
}

impl Default for FakeHomeChain {
    fn default() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            configs: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeHomeChain {
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_configs(&self, don_id: u32, plugin_type: PluginType, configs: Vec<OcrConfig>) {
        self.configs
            .lock()
            .unwrap()
            .insert((DonId::new(don_id), plugin_type), configs);
    }

    /// Register one commit and one exec config for a DON.
    pub fn set_valid_configs(&self, don_id: u32) {
        for plugin_type in PluginType::ALL {
            self.set_configs(don_id, plugin_type, vec![ocr_config(plugin_type)]);
        }
    }
}

#[async_trait]
impl HomeChainReader for FakeHomeChain {
    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn get_ocr_configs(
        &self,
        don_id: DonId,
        plugin_type: PluginType,
    ) -> anyhow::Result<Vec<OcrConfig>> {
        Ok(self
            .configs
            .lock()
            .unwrap()
            .get(&(don_id, plugin_type))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_all_chain_configs(&self) -> anyhow::Result<BTreeMap<ChainSelector, ChainConfig>> {
        Ok(BTreeMap::new())
    }
}

// =============================================================================
// OCR library
// =============================================================================

type OracleKey = (DonId, PluginType);

/// OCR library recording which oracles are running.
#[derive(Default)]
pub struct FakeOcr {
    running: Arc<Mutex<HashMap<OracleKey, bool>>>,
    created: AtomicUsize,
    fail_start: Mutex<Option<PluginType>>,
}

impl FakeOcr {
    /// Make oracles of this plugin type fail to start.
    pub fn fail_start_for(&self, plugin_type: Option<PluginType>) {
        *self.fail_start.lock().unwrap() = plugin_type;
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn is_running(&self, don_id: u32, plugin_type: PluginType) -> bool {
        self.running
            .lock()
            .unwrap()
            .get(&(DonId::new(don_id), plugin_type))
            .copied()
            .unwrap_or(false)
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().unwrap().values().filter(|r| **r).count()
    }
}

#[async_trait]
impl OcrLibrary for FakeOcr {
    async fn new_oracle(&self, args: OracleArgs) -> anyhow::Result<Box<dyn Oracle>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let fail_start = *self.fail_start.lock().unwrap() == Some(args.plugin_type);
        Ok(Box::new(FakeOracle {
            key: (args.don_id, args.plugin_type),
            running: Arc::clone(&self.running),
            fail_start,
        }))
    }
}

struct FakeOracle {
    key: OracleKey,
    running: Arc<Mutex<HashMap<OracleKey, bool>>>,
    fail_start: bool,
}

#[async_trait]
impl Oracle for FakeOracle {
    async fn start(&self) -> anyhow::Result<()> {
        if self.fail_start {
            anyhow::bail!("oracle refused to start");
        }
        self.running.lock().unwrap().insert(self.key, true);
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.running.lock().unwrap().insert(self.key, false);
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A reconciler wired to fakes, running as `self_peer`.
pub struct Harness {
    pub registry: Arc<FakeRegistry>,
    pub home_chain: Arc<FakeHomeChain>,
    pub ocr: Arc<FakeOcr>,
    pub self_peer: PeerId,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(FakeRegistry::default()),
            home_chain: Arc::new(FakeHomeChain::default()),
            ocr: Arc::new(FakeOcr::default()),
            self_peer: peer(1),
        }
    }

    pub fn reconciler(&self) -> Reconciler {
        let mut relayers = Relayers::new();
        let relay_id = RelayId::new("evm", "1337");
        relayers.insert(relay_id.clone(), Arc::new(LocalRelayer::new(relay_id)));

        let factory = OracleFactory::new(
            Arc::new(PeerWrapper {
                peer_id: self.self_peer,
                announce_addresses: vec![],
            }),
            JobInfo {
                job_id: 1,
                external_job_id: Uuid::nil(),
                is_new_job: false,
                transmitter_id: "0xtransmitter".to_string(),
            },
            Arc::new(relayers),
            OcrStore::open_in_memory().unwrap(),
            Arc::clone(&self.ocr) as Arc<dyn OcrLibrary>,
        )
        .with_keyrings(Keyrings::single(ChainType::Evm, "kb_evm"));

        Reconciler::new(
            ccip_capability(),
            self.self_peer,
            Arc::clone(&self.registry) as Arc<dyn CapabilityRegistry>,
            Arc::clone(&self.home_chain) as Arc<dyn HomeChainReader>,
            Arc::new(factory),
        )
    }
}
