//! Full service lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::beacon::BeaconClient;
use crate::config::Config;
use crate::contracts::InboxContractClient;
use crate::indexer::Indexer;
use crate::slot_clock::SlotClock;
use crate::storage::PostgresStore;

/// Runs the indexer service until a shutdown signal arrives.
///
/// Steps:
/// 1. Install the signal handler and metrics recorder
/// 2. Open the database and apply migrations
/// 3. Create the beacon client and fetch the chain's slot parameters
/// 4. Create the L1 event source
/// 5. Run the scan loop; it drains its in-flight window before returning
pub async fn run(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    if config.metrics.enabled {
        let addr = SocketAddr::new(config.metrics.addr, config.metrics.port);
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus recorder")?;
        info!(%addr, "metrics server started");
    }

    let store = PostgresStore::connect(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to database")?;
    store.run_migrations().await.context("failed to run database migrations")?;

    let beacon = BeaconClient::new(config.beacon_url.clone(), config.rpc_timeout)
        .context("failed to create beacon client")?;
    let slot_clock = SlotClock::from_beacon(&beacon)
        .await
        .context("failed to fetch beacon chain parameters")?;
    info!(endpoint = %config.beacon_url, "beacon client initialized");

    let l1 = InboxContractClient::new(
        config.l1_rpc.clone(),
        config.inbox_address,
        config.rpc_timeout,
    )
    .context("failed to create L1 client")?;
    info!(endpoint = %config.l1_rpc, inbox = %config.inbox_address, "L1 client initialized");

    let indexer = Indexer::new(
        config.indexer,
        Arc::new(l1),
        Arc::new(beacon),
        Arc::new(store),
        slot_clock,
        cancel.child_token(),
    );

    indexer.run().await?;

    info!("service stopped");
    Ok(())
}

/// Installs SIGTERM + SIGINT handlers that cancel the given token.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.expect("failed to listen for SIGINT");
                    info!("received SIGINT, shutting down");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.expect("failed to listen for SIGINT");
            info!("received SIGINT, shutting down");
        }

        cancel.cancel();
    });
}
