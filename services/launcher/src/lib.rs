//! CCIP Capability Launcher Library
//!
//! The launcher runs on every node of a capability network. It watches the
//! capability registry and keeps one commit oracle and one exec oracle running
//! for each CCIP DON this node is a member of.
//!
//! ## Architecture
//!
//! ```text
//! Launcher
//! └── monitor task (Reconciler)
//!     ├── CapabilityRegistry   (registry snapshots)
//!     ├── HomeChainReader      (OCR configs per DON)
//!     └── OracleCreator        (relayer + OCR library)
//! ```
//!
//! One task owns the DON table and the applied snapshot. Status queries go
//! through a [`LauncherHandle`] instead of locks.
//!
//! ## Modules
//!
//! - `ocr`: OCR library surface and the OCR state database
//! - `oracle`: oracle pairs, config tracking and the oracle factory
//! - `reconciler`: the per-tick registry reconciliation
//! - `relay`: relayer lookup by chain selector

pub mod config;
pub mod error;
pub mod home_chain;
pub mod keyring;
pub mod launcher;
pub mod ocr;
pub mod oracle;
pub mod plugin;
pub mod reconciler;
pub mod registry;
pub mod relay;
pub mod status;

pub use error::{LauncherError, ParseError};
pub use launcher::Launcher;
pub use reconciler::{Reconciler, TickOutcome};
pub use status::{LauncherHandle, LauncherStatus};
