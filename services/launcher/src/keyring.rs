//! Key bundle selection for OCR oracles.
//!
//! Key material itself lives in the node's keystore. The launcher only picks
//! which bundle an oracle signs with, based on the chain family it reports to.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LauncherError, ParseError};

/// Chain family of a relay network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    Evm,
    Solana,
    Starknet,
    Cosmos,
}

impl ChainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Solana => "solana",
            Self::Starknet => "starknet",
            Self::Cosmos => "cosmos",
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "evm" => Ok(Self::Evm),
            "solana" => Ok(Self::Solana),
            "starknet" => Ok(Self::Starknet),
            "cosmos" => Ok(Self::Cosmos),
            other => Err(ParseError::UnknownChainType(other.to_string())),
        }
    }
}

/// Reference to the keystore bundle used for on-chain report signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnchainKeyring {
    pub chain_type: ChainType,
    pub key_bundle_id: String,
}

/// Reference to the keystore bundle used for off-chain protocol messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffchainKeyring {
    pub key_bundle_id: String,
}

/// Key bundle ids by chain family.
#[derive(Debug, Clone, Default)]
pub struct Keyrings {
    bundles: HashMap<ChainType, String>,
}

impl Keyrings {
    /// Keyrings with a single bundle.
    pub fn single(chain_type: ChainType, key_bundle_id: impl Into<String>) -> Self {
        let mut keyrings = Self::default();
        keyrings.insert(chain_type, key_bundle_id);
        keyrings
    }

    pub fn insert(&mut self, chain_type: ChainType, key_bundle_id: impl Into<String>) {
        self.bundles.insert(chain_type, key_bundle_id.into());
    }

    /// Select the onchain and offchain keyrings for a chain family.
    pub fn select(
        &self,
        chain_type: ChainType,
    ) -> Result<(OnchainKeyring, OffchainKeyring), LauncherError> {
        let bundle = self
            .bundles
            .get(&chain_type)
            .ok_or(LauncherError::MissingKeyBundle(chain_type))?;

        Ok((
            OnchainKeyring {
                chain_type,
                key_bundle_id: bundle.clone(),
            },
            OffchainKeyring {
                key_bundle_id: bundle.clone(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_type_parse() {
        assert_eq!("EVM".parse::<ChainType>().unwrap(), ChainType::Evm);
        assert_eq!("solana".parse::<ChainType>().unwrap(), ChainType::Solana);
        assert_eq!(
            "bitcoin".parse::<ChainType>().unwrap_err(),
            ParseError::UnknownChainType("bitcoin".to_string())
        );
    }

    #[test]
    fn test_select_keyring() {
        let keyrings = Keyrings::single(ChainType::Evm, "kb_evm");
        let (onchain, offchain) = keyrings.select(ChainType::Evm).unwrap();
        assert_eq!(onchain.chain_type, ChainType::Evm);
        assert_eq!(onchain.key_bundle_id, "kb_evm");
        assert_eq!(offchain.key_bundle_id, "kb_evm");
    }

    #[test]
    fn test_select_missing_keyring() {
        let keyrings = Keyrings::single(ChainType::Evm, "kb_evm");
        let err = keyrings.select(ChainType::Solana).unwrap_err();
        assert!(matches!(err, LauncherError::MissingKeyBundle(ChainType::Solana)));
    }
}
