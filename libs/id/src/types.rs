//! Typed identifier definitions.
//!
//! Numeric ids mirror the registry contract's integer keys; 32-byte ids
//! mirror its `bytes32` fields.

use crate::{define_bytes32_id, define_numeric_id};

// =============================================================================
// Registry
// =============================================================================

define_numeric_id!(
    /// Identifier of a DON in the capability registry.
    DonId,
    u32
);

define_numeric_id!(
    /// Identifier of a node operator in the capability registry.
    NodeOperatorId,
    u32
);

define_bytes32_id!(
    /// A node's P2P identity as stored on-chain (the raw ed25519 public key).
    PeerId
);

define_bytes32_id!(
    /// Hashed capability identity, `keccak256(version ++ labelled_name)`.
    CapabilityId
);

// =============================================================================
// Chains and OCR
// =============================================================================

define_numeric_id!(
    /// Chain-family-agnostic chain identifier used across CCIP.
    ChainSelector,
    u64
);

define_bytes32_id!(
    /// Digest identifying one OCR configuration.
    ConfigDigest
);

impl ConfigDigest {
    /// Returns the two-byte domain prefix stamped on the digest.
    #[must_use]
    pub fn prefix(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }
}
