//! In-process OCR stand-in.
//!
//! `LocalOcr` accepts the same [`OracleArgs`] as the real engine and runs a
//! small task per oracle that follows config pushes and persists them. It
//! does not take part in consensus; the binary uses it until the consensus
//! engine is linked in.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ccip_id::DonId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Oracle, OcrLibrary, OracleArgs, PersistentState};
use crate::plugin::PluginType;

/// OCR library stand-in.
#[derive(Default)]
pub struct LocalOcr {
    created: AtomicU64,
}

impl LocalOcr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of oracles constructed so far.
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrLibrary for LocalOcr {
    async fn new_oracle(&self, args: OracleArgs) -> Result<Box<dyn Oracle>> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        info!(
            don_id = %args.don_id,
            plugin_type = %args.plugin_type,
            oracle = n,
            bootstrappers = args.v2_bootstrappers.len(),
            provider = %args.reporting_plugin_factory.provider.name(),
            "[LOCAL] Creating oracle"
        );

        Ok(Box::new(LocalOracle::new(args)))
    }
}

/// Oracle returned by [`LocalOcr`].
pub struct LocalOracle {
    args: OracleArgs,
    running: AtomicBool,
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LocalOracle {
    fn new(args: OracleArgs) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            args,
            running: AtomicBool::new(false),
            stop_tx,
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn persist_latest_config(args: &OracleArgs) -> Result<()> {
        let config = args.contract_config_tracker.latest_config(0);
        args.database
            .write_config(&config)
            .context("Failed to persist contract config")?;

        if args.database.read_state(&config.config_digest)?.is_none() {
            args.database
                .write_state(&config.config_digest, &PersistentState::default())
                .context("Failed to initialize persistent state")?;
        }
        Ok(())
    }
}

#[async_trait]
impl Oracle for LocalOracle {
    async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            anyhow::bail!("oracle already started");
        }

        Self::persist_latest_config(&self.args)?;

        let mut notify = self.args.contract_config_tracker.notify();
        let mut stop = self.stop_tx.subscribe();
        let database = std::sync::Arc::clone(&self.args.database);
        let tracker = self.args.contract_config_tracker.clone();
        let don_id: DonId = self.args.don_id;
        let plugin_type: PluginType = self.args.plugin_type;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = notify.changed() => {
                        if changed.is_err() {
                            debug!(%don_id, %plugin_type, "[LOCAL] Config channel closed");
                            break;
                        }
                        let config = tracker.latest_config(0);
                        info!(
                            %don_id,
                            %plugin_type,
                            config_digest = %config.config_digest,
                            config_count = config.config_count,
                            "[LOCAL] Observed new OCR config"
                        );
                        if let Err(e) = database.write_config(&config) {
                            warn!(
                                %don_id,
                                %plugin_type,
                                error = %e,
                                "[LOCAL] Failed to persist config"
                            );
                        }
                    }
                    _ = stop.changed() => {
                        break;
                    }
                }
            }
        });

        match self.task.lock() {
            Ok(mut task) => *task = Some(handle),
            Err(_) => anyhow::bail!("oracle task lock poisoned"),
        }

        info!(%don_id, %plugin_type, "[LOCAL] Oracle started");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let _ = self.stop_tx.send(true);

        let handle = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(_) => anyhow::bail!("oracle task lock poisoned"),
        };
        if let Some(handle) = handle {
            handle.await.context("Oracle task failed")?;
        }

        self.running.store(false, Ordering::SeqCst);
        info!(
            don_id = %self.args.don_id,
            plugin_type = %self.args.plugin_type,
            "[LOCAL] Oracle closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use alloy_primitives::Bytes;
    use ccip_id::{ChainSelector, ConfigDigest, PeerId};

    use super::*;
    use crate::keyring::{ChainType, Keyrings};
    use crate::ocr::{
        ContractConfig, LocalConfig, OcrDatabase, OcrStore, PeerWrapper, ReportingPluginFactory,
    };
    use crate::oracle::{ConfigTracker, OffchainConfigDigester};
    use crate::relay::{LocalRelayer, PluginArgs, RelayArgs, RelayId, Relayer};

    fn contract_config(count: u64) -> ContractConfig {
        ContractConfig {
            config_digest: ConfigDigest::from_bytes([count as u8; 32]),
            config_count: count,
            signers: vec![],
            transmitters: vec![],
            f: 1,
            onchain_config: Bytes::new(),
            offchain_config_version: 1,
            offchain_config: Bytes::new(),
        }
    }

    async fn oracle_args(
        store: &OcrStore,
        rx: watch::Receiver<ContractConfig>,
    ) -> OracleArgs {
        let provider = LocalRelayer::new(RelayId::new("evm", "1337"))
            .new_plugin_provider(
                RelayArgs {
                    external_job_id: uuid::Uuid::nil(),
                    job_id: 1,
                    contract_id: "0x11".to_string(),
                    new: false,
                    relay_config: serde_json::json!({}),
                    provider_type: PluginType::Commit.provider_type().to_string(),
                },
                PluginArgs {
                    transmitter_id: "0xabc".to_string(),
                    plugin_config: serde_json::json!({}),
                },
            )
            .await
            .unwrap();
        let (onchain_keyring, offchain_keyring) =
            Keyrings::single(ChainType::Evm, "kb").select(ChainType::Evm).unwrap();

        OracleArgs {
            don_id: DonId::new(1),
            plugin_type: PluginType::Commit,
            network: Arc::new(PeerWrapper {
                peer_id: PeerId::from_bytes([1u8; 32]),
                announce_addresses: vec![],
            }),
            v2_bootstrappers: vec![],
            contract_config_tracker: ConfigTracker::new(rx),
            offchain_config_digester: OffchainConfigDigester::new(
                ChainSelector::new(1),
                Bytes::from(vec![0x11; 20]),
            ),
            database: Arc::new(store.scoped(1, PluginType::Commit)),
            local_config: LocalConfig::default(),
            onchain_keyring,
            offchain_keyring,
            reporting_plugin_factory: ReportingPluginFactory {
                plugin_type: PluginType::Commit,
                provider,
            },
        }
    }

    #[tokio::test]
    async fn test_start_persists_config_and_state() {
        let store = OcrStore::open_in_memory().unwrap();
        let (_tx, rx) = watch::channel(contract_config(1));
        let ocr = LocalOcr::new();

        let oracle = ocr.new_oracle(oracle_args(&store, rx).await).await.unwrap();
        assert_eq!(ocr.created_count(), 1);
        oracle.start().await.unwrap();

        let db = store.scoped(1, PluginType::Commit);
        assert_eq!(db.read_config().unwrap(), Some(contract_config(1)));
        assert_eq!(
            db.read_state(&contract_config(1).config_digest).unwrap(),
            Some(PersistentState::default())
        );

        oracle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_pushed_config_is_persisted() {
        let store = OcrStore::open_in_memory().unwrap();
        let (tx, rx) = watch::channel(contract_config(1));
        let oracle = LocalOracle::new(oracle_args(&store, rx).await);

        oracle.start().await.unwrap();
        assert!(oracle.is_running());

        tx.send(contract_config(2)).unwrap();

        let db = store.scoped(1, PluginType::Commit);
        let mut persisted = None;
        for _ in 0..100 {
            persisted = db.read_config().unwrap();
            if persisted.as_ref().map(|c| c.config_count) == Some(2) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(persisted.map(|c| c.config_count), Some(2));

        oracle.close().await.unwrap();
        assert!(!oracle.is_running());
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let store = OcrStore::open_in_memory().unwrap();
        let (_tx, rx) = watch::channel(contract_config(1));
        let oracle = LocalOracle::new(oracle_args(&store, rx).await);

        oracle.start().await.unwrap();
        assert!(oracle.start().await.is_err());
        oracle.close().await.unwrap();
    }
}
