//! CCIP Capability Launcher
//!
//! Keeps this node's CCIP oracles aligned with the capability registry.
//!
//! ## Architecture
//!
//! - **Home chain poller**: Refreshes the chain config cache periodically
//! - **Launcher**: Polls the registry and starts/stops oracle pairs per DON
//! - **OCR library**: In-process stand-in until the consensus engine is linked

use std::sync::Arc;

use anyhow::{Context, Result};
use ccip_launcher::config::Config;
use ccip_launcher::home_chain::HttpHomeChainReader;
use ccip_launcher::keyring::Keyrings;
use ccip_launcher::ocr::{LocalOcr, OcrStore, PeerWrapper};
use ccip_launcher::oracle::{JobInfo, OracleFactory};
use ccip_launcher::registry::HttpCapabilityRegistry;
use ccip_launcher::relay::{LocalRelayer, Relayers};
use ccip_launcher::{Launcher, Reconciler};
use ccip_reconcile::CapabilityDescriptor;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting CCIP capability launcher");
    info!(
        peer_id = %config.peer_id,
        registry_url = %config.registry_url,
        home_chain_url = %config.home_chain_url,
        capability = %config.capability_name,
        version = %config.capability_version,
        "Configuration loaded"
    );

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start the home chain poller
    let home_chain = Arc::new(HttpHomeChainReader::new(
        config.home_chain_url.clone(),
        config.home_chain_poll_interval(),
    )?);
    let poller_handle = tokio::spawn(Arc::clone(&home_chain).run_poller(shutdown_rx.clone()));

    // Create the relayers (local for now)
    let mut relayers = Relayers::new();
    for relay_id in config.chain_selectors.relays() {
        relayers.insert(relay_id.clone(), Arc::new(LocalRelayer::new(relay_id.clone())));
    }
    info!(relayer_count = relayers.len(), "Relayers initialized");

    if let Some(dir) = std::path::Path::new(&config.database_path).parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }
    let store = OcrStore::open(&config.database_path)
        .with_context(|| format!("Failed to open OCR database at {}", config.database_path))?;

    let factory = OracleFactory::new(
        Arc::new(PeerWrapper {
            peer_id: config.peer_id,
            announce_addresses: config.announce_addresses.clone(),
        }),
        JobInfo {
            job_id: config.job_id,
            external_job_id: config.external_job_id,
            is_new_job: config.is_new_job,
            transmitter_id: config.transmitter_id.clone(),
        },
        Arc::new(relayers),
        store,
        // The OCR library (local for now)
        Arc::new(LocalOcr::new()),
    )
    .with_selectors(config.chain_selectors.clone())
    .with_keyrings(Keyrings::single(config.chain_type, config.key_bundle_id.clone()));

    let reconciler = Reconciler::new(
        CapabilityDescriptor::new(
            config.capability_name.clone(),
            config.capability_version.clone(),
        ),
        config.peer_id,
        Arc::new(HttpCapabilityRegistry::new(config.registry_url.clone())?),
        home_chain,
        Arc::new(factory),
    );

    let mut launcher = Launcher::new(reconciler, config.monitor_interval());
    launcher.start()?;

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received shutdown signal");

    // Signal shutdown to all workers
    let _ = shutdown_tx.send(true);

    if let Err(e) = launcher.close().await {
        error!(error = %e, "Launcher did not shut down cleanly");
    }
    if let Err(e) = poller_handle.await {
        error!(error = %e, "Home chain poller task panicked");
    }

    info!("Capability launcher shutdown complete");
    Ok(())
}
