//! Configuration for the capability launcher.

use std::time::Duration;

use anyhow::{Context, Result};
use ccip_id::PeerId;
use ccip_reconcile::{CCIP_CAPABILITY_NAME, CCIP_CAPABILITY_VERSION};
use uuid::Uuid;

use crate::keyring::ChainType;
use crate::relay::ChainSelectorTable;

/// Launcher configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// This node's P2P id.
    pub peer_id: PeerId,

    /// Addresses announced to other oracles.
    pub announce_addresses: Vec<String>,

    /// Registry read API URL.
    pub registry_url: String,

    /// Home chain read API URL.
    pub home_chain_url: String,

    pub capability_name: String,
    pub capability_version: String,

    /// Registry poll interval in seconds.
    pub monitor_interval_secs: u64,

    /// Chain config cache refresh interval in seconds.
    pub home_chain_poll_secs: u64,

    pub job_id: i32,
    pub external_job_id: Uuid,
    pub is_new_job: bool,
    pub transmitter_id: String,

    /// Chain family of the key bundle.
    pub chain_type: ChainType,
    pub key_bundle_id: String,

    /// Chain selector to relay mapping.
    pub chain_selectors: ChainSelectorTable,

    /// OCR state database path.
    pub database_path: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let peer_id: PeerId = lookup("CCIP_PEER_ID")
            .context("CCIP_PEER_ID is required")?
            .parse()
            .context("CCIP_PEER_ID must be a 32-byte hex id")?;

        let announce_addresses = lookup("CCIP_P2P_ANNOUNCE_ADDRESSES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let monitor_interval_secs = parse_or(&lookup, "CCIP_MONITOR_INTERVAL_SECS", 10)?;
        let home_chain_poll_secs = parse_or(&lookup, "CCIP_HOME_CHAIN_POLL_SECS", 10)?;
        if monitor_interval_secs == 0 || home_chain_poll_secs == 0 {
            anyhow::bail!("poll intervals must be greater than zero");
        }

        let job_id = parse_or(&lookup, "CCIP_JOB_ID", 0)?;
        let external_job_id = parse_or(&lookup, "CCIP_EXTERNAL_JOB_ID", Uuid::nil())?;
        let is_new_job = parse_or(&lookup, "CCIP_NEW_JOB", false)?;

        let chain_type: ChainType = var("CCIP_CHAIN_TYPE", "evm")
            .parse()
            .context("invalid CCIP_CHAIN_TYPE")?;

        let mut chain_selectors = ChainSelectorTable::default();
        if let Some(raw) = lookup("CCIP_CHAIN_SELECTORS") {
            chain_selectors
                .parse_entries(&raw)
                .context("invalid CCIP_CHAIN_SELECTORS")?;
        }

        Ok(Self {
            peer_id,
            announce_addresses,
            registry_url: var("CCIP_REGISTRY_URL", "http://127.0.0.1:8545"),
            home_chain_url: var("CCIP_HOME_CHAIN_URL", "http://127.0.0.1:8545"),
            capability_name: var("CCIP_CAPABILITY_NAME", CCIP_CAPABILITY_NAME),
            capability_version: var("CCIP_CAPABILITY_VERSION", CCIP_CAPABILITY_VERSION),
            monitor_interval_secs,
            home_chain_poll_secs,
            job_id,
            external_job_id,
            is_new_job,
            transmitter_id: var("CCIP_TRANSMITTER_ID", ""),
            chain_type,
            key_bundle_id: var("CCIP_KEY_BUNDLE_ID", "default"),
            chain_selectors,
            database_path: var("CCIP_DATABASE_PATH", "/var/lib/ccip/ocr.sqlite"),
            log_level: var("CCIP_LOG_LEVEL", "info"),
        })
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn home_chain_poll_interval(&self) -> Duration {
        Duration::from_secs(self.home_chain_poll_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use ccip_id::ChainSelector;

    use super::*;
    use crate::relay::RelayId;

    const PEER: &str = "0x0101010101010101010101010101010101010101010101010101010101010101";

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("CCIP_PEER_ID", PEER)]).unwrap();
        assert_eq!(config.peer_id, PeerId::from_bytes([1u8; 32]));
        assert_eq!(config.capability_name, "ccip");
        assert_eq!(config.capability_version, "v1.0.0");
        assert_eq!(config.monitor_interval(), Duration::from_secs(10));
        assert_eq!(config.home_chain_poll_interval(), Duration::from_secs(10));
        assert_eq!(config.job_id, 0);
        assert_eq!(config.external_job_id, Uuid::nil());
        assert!(!config.is_new_job);
        assert_eq!(config.chain_type, ChainType::Evm);
        assert_eq!(config.database_path, "/var/lib/ccip/ocr.sqlite");
        assert!(config.announce_addresses.is_empty());
    }

    #[test]
    fn test_peer_id_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("CCIP_PEER_ID"));
    }

    #[test]
    fn test_invalid_interval() {
        assert!(load(&[("CCIP_PEER_ID", PEER), ("CCIP_MONITOR_INTERVAL_SECS", "soon")]).is_err());
        assert!(load(&[("CCIP_PEER_ID", PEER), ("CCIP_HOME_CHAIN_POLL_SECS", "0")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CCIP_PEER_ID", PEER),
            ("CCIP_MONITOR_INTERVAL_SECS", "3"),
            ("CCIP_JOB_ID", "42"),
            ("CCIP_NEW_JOB", "true"),
            ("CCIP_CHAIN_TYPE", "solana"),
            ("CCIP_CHAIN_SELECTORS", "99=solana:devnet"),
            ("CCIP_P2P_ANNOUNCE_ADDRESSES", "10.0.0.1:6690, 10.0.0.2:6690"),
        ])
        .unwrap();

        assert_eq!(config.monitor_interval(), Duration::from_secs(3));
        assert_eq!(config.job_id, 42);
        assert!(config.is_new_job);
        assert_eq!(config.chain_type, ChainType::Solana);
        assert_eq!(
            config.chain_selectors.resolve(ChainSelector::new(99)).unwrap(),
            &RelayId::new("solana", "devnet")
        );
        assert_eq!(config.announce_addresses, vec!["10.0.0.1:6690", "10.0.0.2:6690"]);
    }
}
