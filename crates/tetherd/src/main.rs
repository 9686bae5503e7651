//! tetherd — tether sync daemon.
//!
//! Hosts the notification engine and drives its only periodic concern: the
//! resend planner. Transports attach at the `Communicator` seam; until one
//! is wired, outbound messages are logged.

mod comms;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use tether_core::TetherConfig;
use tether_sync::{Engine, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing — RUST_LOG controls verbosity
    // e.g. RUST_LOG=debug cargo run -p tetherd
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = TetherConfig::write_default_if_missing()?;
    let config = TetherConfig::load()?;
    tracing::info!(
        config = %config_path.display(),
        role = %config.node.role,
        max_inflight_chunks = config.sync.max_inflight_chunks,
        resend_interval_secs = config.sync.resend_interval_secs,
        "tetherd starting"
    );

    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(Engine::new(
        &config,
        store,
        Arc::new(comms::LogCommunicator),
    ));

    let resend_interval = Duration::from_secs(config.sync.resend_interval_secs.max(1) as u64);
    let mut ticker = tokio::time::interval(resend_interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                return Ok(());
            }

            _ = ticker.tick() => {
                let engine = engine.clone();
                // The engine blocks on store I/O; keep it off the runtime's
                // reactor threads.
                let outcome = tokio::task::spawn_blocking(move || engine.resend_pending()).await;
                match outcome {
                    Ok(Ok(0)) => {}
                    Ok(Ok(n)) => tracing::debug!(requests = n, "resend sweep complete"),
                    Ok(Err(e)) => tracing::warn!(error = %e, "resend sweep failed"),
                    Err(e) => tracing::error!(error = %e, "resend task panicked"),
                }
            }
        }
    }
}
