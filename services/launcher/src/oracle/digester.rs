//! Config digest computation for CCIP OCR3 configs.

use alloy_primitives::{keccak256, Bytes};
use ccip_id::{ChainSelector, ConfigDigest};

use crate::ocr::ContractConfig;

/// Domain prefix stamped on CCIP multichain config digests.
pub const CCIP_MULTICHAIN_DIGEST_PREFIX: u16 = 0x000a;

/// Computes config digests bound to one chain and offramp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffchainConfigDigester {
    chain_selector: ChainSelector,
    offramp_address: Bytes,
}

impl OffchainConfigDigester {
    pub fn new(chain_selector: ChainSelector, offramp_address: Bytes) -> Self {
        Self {
            chain_selector,
            offramp_address,
        }
    }

    /// Digest of everything in `config` except its own digest field.
    pub fn config_digest(&self, config: &ContractConfig) -> ConfigDigest {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&self.chain_selector.value().to_be_bytes());
        put_bytes(&mut buf, &self.offramp_address);
        buf.extend_from_slice(&config.config_count.to_be_bytes());
        put_list(&mut buf, &config.signers);
        put_list(&mut buf, &config.transmitters);
        buf.push(config.f);
        put_bytes(&mut buf, &config.onchain_config);
        buf.extend_from_slice(&config.offchain_config_version.to_be_bytes());
        put_bytes(&mut buf, &config.offchain_config);

        let mut digest = keccak256(&buf).0;
        digest[..2].copy_from_slice(&CCIP_MULTICHAIN_DIGEST_PREFIX.to_be_bytes());
        ConfigDigest::from_bytes(digest)
    }

    pub fn config_digest_prefix(&self) -> u16 {
        CCIP_MULTICHAIN_DIGEST_PREFIX
    }
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn put_list(buf: &mut Vec<u8>, items: &[Bytes]) {
    buf.extend_from_slice(&(items.len() as u32).to_be_bytes());
    for item in items {
        put_bytes(buf, item);
    }
}
