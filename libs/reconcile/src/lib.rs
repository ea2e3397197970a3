//! Registry reconciliation primitives.
//!
//! This library provides the pure half of the capability launcher: the
//! read model of the on-chain capability registry and the diff engine that
//! turns two snapshots into start/stop decisions. Key concepts:
//!
//! - **Snapshot**: an immutable [`RegistryState`] read in one consistent call.
//! - **CCIP DON**: a DON whose capability configurations reference the
//!   capability being launched.
//! - **Diff**: the partition of CCIP DON ids into added, removed and updated.
//!
//! # Invariants
//!
//! - Diffing is pure: identical inputs give identical outputs
//! - Every CCIP DON id of either snapshot lands in exactly one partition
//! - A malformed snapshot aborts the whole diff; nothing is partially classified

use std::time::Duration;

use ccip_id::DonId;
use thiserror::Error;

mod diff;
mod registry;

pub use diff::{capability_id, diff, filter_ccip_dons, RegistryDiff};
pub use registry::{
    CapabilityConfiguration, CapabilityDescriptor, DonInfo, NodeInfo, RegistryState,
};

/// Reconciliation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The launched capability is not registered in the snapshot.
    #[error("capability {labelled_name} {version} not found in registry state")]
    CapabilityNotFound {
        labelled_name: String,
        version: String,
    },

    /// A DON hosting the CCIP capability also hosts other capabilities.
    #[error(
        "DON {don_id} has {configurations} capability configurations, \
         a CCIP DON must have exactly one"
    )]
    InvalidDonShape {
        don_id: DonId,
        configurations: usize,
    },
}

impl ReconcileError {
    /// Returns true if the error describes malformed registry data rather
    /// than a missing registration.
    pub fn is_data_integrity(&self) -> bool {
        matches!(self, Self::InvalidDonShape { .. })
    }
}

/// Default interval between registry polls.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(10);

/// Labelled name of the CCIP capability.
pub const CCIP_CAPABILITY_NAME: &str = "ccip";

/// Version of the CCIP capability launched by default.
pub const CCIP_CAPABILITY_VERSION: &str = "v1.0.0";
