//! Contract config tracker backed by a push channel.
//!
//! The OCR library polls its tracker for the latest config. CCIP configs come
//! from the home chain instead, so the launcher pushes them into a `watch`
//! channel and the tracker serves whatever was pushed last.

use ccip_id::ConfigDigest;
use tokio::sync::watch;

use crate::ocr::ContractConfig;

/// Pull-side view of the pushed OCR config.
#[derive(Debug, Clone)]
pub struct ConfigTracker {
    rx: watch::Receiver<ContractConfig>,
}

impl ConfigTracker {
    pub fn new(rx: watch::Receiver<ContractConfig>) -> Self {
        Self { rx }
    }

    /// Receiver that fires whenever a new config is pushed.
    pub fn notify(&self) -> watch::Receiver<ContractConfig> {
        self.rx.clone()
    }

    /// Block height the config changed in, and its digest.
    ///
    /// Configs do not live on the reporting chain, so the height is always zero.
    pub fn latest_config_details(&self) -> (u64, ConfigDigest) {
        (0, self.rx.borrow().config_digest)
    }

    pub fn latest_config(&self, _changed_in_block: u64) -> ContractConfig {
        self.rx.borrow().clone()
    }

    pub fn latest_block_height(&self) -> u64 {
        0
    }
}
