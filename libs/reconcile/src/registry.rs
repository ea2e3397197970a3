//! Read model of the on-chain capability registry.
//!
//! A [`RegistryState`] is produced in one consistent read and then replaced
//! wholesale on the next poll. Nothing here is mutated after construction.

use std::collections::BTreeSet;

use alloy_primitives::Bytes;
use ccip_id::{CapabilityId, DonId, NodeOperatorId, PeerId};
use serde::{Deserialize, Serialize};

use crate::diff::capability_id;

/// One consistent snapshot of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    #[serde(default)]
    pub dons: Vec<DonInfo>,
    #[serde(default)]
    pub capabilities: Vec<CapabilityDescriptor>,
    #[serde(default)]
    pub nodes: Vec<NodeInfo>,
}

impl RegistryState {
    /// Find a capability by exact name and version.
    pub fn find_capability(
        &self,
        labelled_name: &str,
        version: &str,
    ) -> Option<&CapabilityDescriptor> {
        self.capabilities
            .iter()
            .find(|c| c.labelled_name == labelled_name && c.version == version)
    }

    /// Find a DON by id.
    pub fn don(&self, id: DonId) -> Option<&DonInfo> {
        self.dons.iter().find(|d| d.id == id)
    }

    /// Find a node by its P2P id.
    pub fn node(&self, p2p_id: &PeerId) -> Option<&NodeInfo> {
        self.nodes.iter().find(|n| &n.p2p_id == p2p_id)
    }
}

/// A DON as recorded in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonInfo {
    pub id: DonId,

    /// P2P ids of member nodes.
    pub node_p2p_ids: BTreeSet<PeerId>,

    pub capability_configurations: Vec<CapabilityConfiguration>,

    /// Fault tolerance parameter.
    pub f: u8,

    #[serde(default)]
    pub config_count: u32,

    #[serde(default)]
    pub is_public: bool,

    #[serde(default)]
    pub accepts_workflows: bool,
}

impl DonInfo {
    /// Returns true if the given peer is a member of this DON.
    pub fn has_member(&self, peer: &PeerId) -> bool {
        self.node_p2p_ids.contains(peer)
    }

    /// Returns true if any configuration references the capability.
    pub fn hosts(&self, capability: &CapabilityId) -> bool {
        self.capability_configurations
            .iter()
            .any(|c| &c.capability_id == capability)
    }
}

/// Per-DON configuration blob for one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityConfiguration {
    pub capability_id: CapabilityId,

    /// Opaque capability-specific config.
    #[serde(default)]
    pub config: Bytes,
}

/// A registered capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub labelled_name: String,
    pub version: String,
}

impl CapabilityDescriptor {
    pub fn new(labelled_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            labelled_name: labelled_name.into(),
            version: version.into(),
        }
    }

    /// On-chain identity of this capability.
    pub fn id(&self) -> CapabilityId {
        capability_id(&self.labelled_name, &self.version)
    }
}

impl std::fmt::Display for CapabilityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.labelled_name, self.version)
    }
}

/// A node registered with a node operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub p2p_id: PeerId,
    pub node_operator_id: NodeOperatorId,

    /// Onchain signing key, left-padded to 32 bytes.
    pub signer: Bytes,

    #[serde(default)]
    pub hashed_capability_ids: Vec<CapabilityId>,

    #[serde(default)]
    pub config_count: u32,
}
