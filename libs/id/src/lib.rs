//! # ccip-id
//!
//! Typed identifiers shared by the registry model and the launcher.
//!
//! ## Design Principles
//!
//! - Identifiers mirror their on-chain representation (`uint32`, `uint64`, `bytes32`)
//! - Hash-like identifiers have a canonical `0x`-prefixed lowercase hex form
//! - Parsing is strict and round-trips with formatting
//! - Distinct types keep a peer id from being passed where a capability id is expected
//!
//! ## Formats
//!
//! - `DonId`: decimal `u32`, e.g. `7`
//! - `ChainSelector`: decimal `u64`, e.g. `5009297550715157269`
//! - `PeerId`, `CapabilityId`, `ConfigDigest`: 32 bytes, e.g.
//!   `0x0000000000000000000000000000000000000000000000000000000000000001`

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;
