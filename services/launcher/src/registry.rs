//! Capability registry client.
//!
//! The launcher only reads the registry: one consistent snapshot per tick.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ccip_reconcile::RegistryState;
use tracing::{debug, error};

/// Source of registry snapshots.
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    /// Fetch the latest internally consistent registry snapshot.
    async fn latest_state(&self) -> Result<RegistryState>;
}

/// Registry client for a registry syncer's HTTP read API.
pub struct HttpCapabilityRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCapabilityRegistry {
    /// Create a new registry client.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CapabilityRegistry for HttpCapabilityRegistry {
    async fn latest_state(&self) -> Result<RegistryState> {
        let url = format!("{}/v1/registry/state", self.base_url);
        debug!(url = %url, "Fetching registry state");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Failed to fetch registry state");
            anyhow::bail!("Failed to fetch registry state: {} - {}", status, body);
        }

        let state: RegistryState = response.json().await?;
        debug!(
            don_count = state.dons.len(),
            capability_count = state.capabilities.len(),
            node_count = state.nodes.len(),
            "Fetched registry state"
        );

        Ok(state)
    }
}
