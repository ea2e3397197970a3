//! Launcher error types.

use ccip_id::{ChainSelector, DonId, IdError};
use thiserror::Error;

use crate::keyring::ChainType;
use crate::plugin::PluginType;
use crate::relay::RelayId;

/// Errors raised while reconciling DONs or managing the monitor task.
#[derive(Debug, Error)]
pub enum LauncherError {
    /// Reading OCR configs from the home chain failed.
    #[error("failed to fetch {plugin_type} OCR configs for DON {don_id}: {source}")]
    OcrConfigFetch {
        don_id: DonId,
        plugin_type: PluginType,
        #[source]
        source: anyhow::Error,
    },

    /// The home chain did not hold exactly one OCR config for the plugin.
    #[error("expected exactly one {plugin_type} OCR config for DON {don_id}, got {count}")]
    InvalidOcrConfigCount {
        don_id: DonId,
        plugin_type: PluginType,
        count: usize,
    },

    /// A config was handed to the wrong plugin constructor.
    #[error("expected a {expected} OCR config, got {actual}")]
    PluginTypeMismatch {
        expected: PluginType,
        actual: PluginType,
    },

    /// No relay is known for the chain selector.
    #[error("unknown chain selector {0}")]
    UnknownChainSelector(ChainSelector),

    /// The relay is known but no relayer is running for it.
    #[error("no relayer found for {0}")]
    RelayerNotFound(RelayId),

    /// The relay's network is not a supported chain family.
    #[error("unsupported relay network {0}")]
    UnsupportedNetwork(String),

    /// The relay's network has no matching key bundle.
    #[error("no key bundle for chain type {0}")]
    MissingKeyBundle(ChainType),

    /// The relayer failed to build a plugin provider.
    #[error("failed to create {plugin_type} plugin provider: {source}")]
    PluginProvider {
        plugin_type: PluginType,
        #[source]
        source: anyhow::Error,
    },

    /// The OCR library rejected the oracle arguments.
    #[error("failed to create {plugin_type} oracle: {source}")]
    OracleCreation {
        plugin_type: PluginType,
        #[source]
        source: anyhow::Error,
    },

    /// The oracle was constructed but failed to start.
    #[error("failed to start {plugin_type} oracle: {source}")]
    OracleStart {
        plugin_type: PluginType,
        #[source]
        source: anyhow::Error,
    },

    /// `start` was called on a running launcher.
    #[error("launcher already started")]
    AlreadyStarted,

    /// The monitor task is not running.
    #[error("launcher monitor is not running")]
    MonitorStopped,

    /// The monitor task panicked.
    #[error("launcher monitor task failed: {0}")]
    MonitorPanicked(String),
}

impl LauncherError {
    /// Returns true if the error comes from malformed registry or home chain data
    /// rather than from an unreachable dependency.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::InvalidOcrConfigCount { .. } | Self::PluginTypeMismatch { .. }
        )
    }

    /// Returns true if the error may clear up on its own, such as an
    /// unreachable home chain.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::OcrConfigFetch { .. })
    }
}

/// Errors from parsing launcher settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown chain type: {0}")]
    UnknownChainType(String),

    #[error("unknown plugin type {0}")]
    UnknownPluginType(u8),

    /// A chain selector table entry is not `selector=network:chain_id`.
    #[error("invalid chain selector entry: {0}")]
    InvalidSelectorEntry(String),

    #[error("invalid chain selector {value}: {source}")]
    InvalidChainSelector {
        value: String,
        #[source]
        source: IdError,
    },
}
