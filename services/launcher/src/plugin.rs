//! CCIP plugin types and the OCR configuration read from the home chain.

use std::fmt;

use alloy_primitives::Bytes;
use ccip_id::{ChainSelector, PeerId};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// The two CCIP consensus roles. Each runs as its own OCR instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PluginType {
    Commit = 0,
    Exec = 1,
}

impl PluginType {
    /// Both plugin types, in the order oracles are created.
    pub const ALL: [PluginType; 2] = [PluginType::Commit, PluginType::Exec];

    /// On-chain `uint8` representation.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Provider type requested from the relayer.
    pub fn provider_type(self) -> &'static str {
        match self {
            Self::Commit => "CCIPOCR3CommitProvider",
            Self::Exec => "CCIPOCR3ExecProvider",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "CCIPCommit"),
            Self::Exec => write!(f, "CCIPExec"),
        }
    }
}

impl TryFrom<u8> for PluginType {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Commit),
            1 => Ok(Self::Exec),
            other => Err(ParseError::UnknownPluginType(other)),
        }
    }
}

impl From<PluginType> for u8 {
    fn from(value: PluginType) -> Self {
        value.as_u8()
    }
}

/// OCR3 configuration for one (DON, plugin type) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrConfig {
    pub plugin_type: PluginType,
    pub chain_selector: ChainSelector,
    pub f: u8,
    pub offchain_config_version: u64,
    pub offramp_address: Bytes,

    #[serde(default)]
    pub bootstrap_p2p_ids: Vec<PeerId>,
    #[serde(default)]
    pub p2p_ids: Vec<PeerId>,

    pub signers: Vec<Bytes>,
    pub transmitters: Vec<Bytes>,
    pub offchain_config: Bytes,

    /// Number of times this config has been set on the home chain.
    #[serde(default)]
    pub config_count: u64,
}

/// Per-chain configuration stored on the home chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Nodes that read from this chain.
    pub readers: Vec<PeerId>,

    /// Fault tolerance of the chain's readers.
    pub f_chain: u8,

    #[serde(default)]
    pub config: Bytes,
}
