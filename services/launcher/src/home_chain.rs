//! Home chain reader.
//!
//! The home chain holds the OCR configs of every CCIP DON and the per-chain
//! configs. Chain configs change rarely, so [`HttpHomeChainReader`] keeps them
//! in a cache refreshed by a background poller. OCR configs are read on demand
//! when a DON is added.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use ccip_id::{ChainSelector, DonId};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::plugin::{ChainConfig, OcrConfig, PluginType};

/// Read access to CCIP configuration on the home chain.
#[async_trait]
pub trait HomeChainReader: Send + Sync {
    /// Whether the reader's view of the home chain is current.
    fn is_healthy(&self) -> bool;

    /// OCR configs registered for a DON and plugin type.
    async fn get_ocr_configs(
        &self,
        don_id: DonId,
        plugin_type: PluginType,
    ) -> Result<Vec<OcrConfig>>;

    /// Every chain config, keyed by chain selector.
    async fn get_all_chain_configs(&self) -> Result<BTreeMap<ChainSelector, ChainConfig>>;
}

struct ChainConfigSnapshot {
    configs: BTreeMap<ChainSelector, ChainConfig>,
    fetched_at: Instant,
}

/// Home chain reader for a home chain indexer's HTTP read API.
pub struct HttpHomeChainReader {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    cache: ArcSwapOption<ChainConfigSnapshot>,
    last_poll_ok: AtomicBool,
}

impl HttpHomeChainReader {
    pub fn new(base_url: impl Into<String>, poll_interval: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval,
            cache: ArcSwapOption::empty(),
            last_poll_ok: AtomicBool::new(false),
        })
    }

    async fn fetch_chain_configs(&self) -> Result<BTreeMap<ChainSelector, ChainConfig>> {
        let url = format!("{}/v1/chain-configs", self.base_url);
        debug!(url = %url, "Fetching chain configs");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Failed to fetch chain configs");
            anyhow::bail!("Failed to fetch chain configs: {} - {}", status, body);
        }

        let configs: BTreeMap<ChainSelector, ChainConfig> = response.json().await?;
        Ok(configs)
    }

    /// Refresh the chain config cache once.
    pub async fn refresh(&self) -> Result<()> {
        match self.fetch_chain_configs().await {
            Ok(configs) => {
                debug!(chain_count = configs.len(), "Refreshed chain configs");
                self.cache.store(Some(Arc::new(ChainConfigSnapshot {
                    configs,
                    fetched_at: Instant::now(),
                })));
                self.last_poll_ok.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.last_poll_ok.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Refresh the cache on every poll interval until shutdown.
    pub async fn run_poller(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Starting home chain poller"
        );

        let mut consecutive_failures = 0u32;
        let mut interval_timer = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = interval_timer.tick() => {
                    match self.refresh().await {
                        Ok(()) => consecutive_failures = 0,
                        Err(e) => {
                            consecutive_failures += 1;
                            if consecutive_failures <= 3 {
                                warn!(error = %e, consecutive_failures, "Home chain poll failed");
                            } else {
                                error!(
                                    error = %e,
                                    consecutive_failures,
                                    "Home chain poll failing repeatedly"
                                );
                            }
                        }
                    }
                }
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        info!("Home chain poller shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl HomeChainReader for HttpHomeChainReader {
    fn is_healthy(&self) -> bool {
        if !self.last_poll_ok.load(Ordering::SeqCst) {
            return false;
        }
        match &*self.cache.load() {
            Some(snapshot) => snapshot.fetched_at.elapsed() <= self.poll_interval * 3,
            None => false,
        }
    }

    async fn get_ocr_configs(
        &self,
        don_id: DonId,
        plugin_type: PluginType,
    ) -> Result<Vec<OcrConfig>> {
        let url = format!(
            "{}/v1/dons/{}/ocr-configs/{}",
            self.base_url,
            don_id,
            plugin_type.as_u8()
        );
        debug!(url = %url, %don_id, %plugin_type, "Fetching OCR configs");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Failed to fetch OCR configs");
            anyhow::bail!("Failed to fetch OCR configs: {} - {}", status, body);
        }

        let configs: Vec<OcrConfig> = response.json().await?;
        Ok(configs)
    }

    async fn get_all_chain_configs(&self) -> Result<BTreeMap<ChainSelector, ChainConfig>> {
        if let Some(snapshot) = self.cache.load_full() {
            return Ok(snapshot.configs.clone());
        }
        self.fetch_chain_configs().await
    }
}
