use std::sync::Arc;

use anyhow::Context;
use blockscout_service_launcher::{database, tracing as bs_tracing};
use bridge_indexer_logic::{
    BridgeDatabase, BridgeIndexer, ChainRegistry, CheckpointStore, InMemoryCheckpointStore,
    RedisCheckpointStore,
};
use migration::Migrator;

use crate::settings::Settings;

const SERVICE_NAME: &str = "bridge_indexer";

/// Bring the process up and run until signalled.
///
/// Startup failures (database, RPC connectivity, token metadata bootstrap)
/// abort with an error; a delivered SIGINT/SIGTERM exits cleanly.
pub async fn run(settings: Settings) -> Result<(), anyhow::Error> {
    bs_tracing::init_logs(SERVICE_NAME, &settings.tracing, &settings.jaeger)?;

    let registry = Arc::new(ChainRegistry::bootstrap().await?);

    let (store, checkpoints): (Option<BridgeDatabase>, Arc<dyn CheckpointStore>) =
        if settings.indexer.testing {
            tracing::warn!("running with TESTING enabled, persistence is disabled");
            (None, Arc::new(InMemoryCheckpointStore::new()))
        } else {
            let db_connection =
                Arc::new(database::initialize_postgres::<Migrator>(&settings.database).await?);
            let checkpoints = RedisCheckpointStore::connect(&settings.checkpoint_url)
                .await
                .context("failed to connect to the checkpoint store")?;
            (
                Some(BridgeDatabase::new(db_connection)),
                Arc::new(checkpoints),
            )
        };

    let indexer = BridgeIndexer::new(registry, store, checkpoints, settings.indexer.clone());
    indexer.start();

    shutdown_signal().await;
    indexer.stop();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
