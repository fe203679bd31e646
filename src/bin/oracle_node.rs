//! Confidential Record Store node
//!
//! Runs the record store, a simulated decryption gateway and the REST API in
//! one process. Configuration comes from the environment; see
//! `ServiceConfig::from_env`. With `SNAPSHOT_PATH` set, node state is loaded
//! at startup and saved on shutdown.

use anyhow::{Context, Result};

use confidential_records::api::{ApiServerBuilder, AppState};
use confidential_records::config::ServiceConfig;
use confidential_records::node::{NodeState, OracleNode};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = ServiceConfig::from_env().context("loading configuration")?;
    log::info!("starting oracle node with {:?}", config);

    let state = match &config.snapshot_path {
        Some(path) if path.exists() => Some(NodeState::load(path)?),
        _ => None,
    };
    let (node, worker) = OracleNode::build(&config, state)?;

    let mut events = node.store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log::info!("store event: {:?}", event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    log::warn!("event logger lagged, {} events dropped", missed)
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    tokio::spawn(worker.run(node.store.clone()));

    let server = ApiServerBuilder::new()
        .bind(config.bind_addr)
        .max_request_size(config.max_request_size)
        .state(AppState::new(node.store.clone(), node.compute.clone()))
        .build()?;

    server
        .start(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    if let Some(path) = &config.snapshot_path {
        node.export_state().save(path)?;
    }
    Ok(())
}
