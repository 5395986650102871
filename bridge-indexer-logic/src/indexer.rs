use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::{
    backfill::BackfillWorker,
    checkpoint::CheckpointStore,
    correlation::BridgeDatabase,
    pipeline::EventPipeline,
    registry::ChainRegistry,
    settings::IndexerSettings,
    tailer::LiveTailer,
};

/// Per-chain fan-out: one backfill worker and one live tailer per configured
/// chain. The two sides of a chain, and the chains themselves, communicate
/// only through the kappa-keyed store.
pub struct BridgeIndexer {
    registry: Arc<ChainRegistry>,
    store: Option<BridgeDatabase>,
    checkpoints: Arc<dyn CheckpointStore>,
    settings: IndexerSettings,
    is_running: AtomicBool,
    handles: RwLock<Vec<JoinHandle<()>>>,
}

impl BridgeIndexer {
    pub fn new(
        registry: Arc<ChainRegistry>,
        store: Option<BridgeDatabase>,
        checkpoints: Arc<dyn CheckpointStore>,
        settings: IndexerSettings,
    ) -> Self {
        Self {
            registry,
            store,
            checkpoints,
            settings,
            is_running: AtomicBool::new(false),
            handles: RwLock::new(Vec::new()),
        }
    }

    pub fn start(&self) {
        if self
            .is_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("bridge indexer already running");
            return;
        }

        let mut handles = self.handles.write();
        for chain in self.registry.chains() {
            let chain_name = chain.spec.name;
            let pipeline = Arc::new(EventPipeline::new(
                chain.clone(),
                self.registry.pools(),
                self.store.clone(),
            ));

            let backfill = BackfillWorker::new(
                chain.clone(),
                pipeline.clone(),
                self.checkpoints.clone(),
            );
            handles.push(tokio::spawn(async move {
                match backfill.run().await {
                    Ok(()) => tracing::info!(chain = chain_name, "backfill worker finished"),
                    Err(err) => {
                        tracing::error!(err = ?err, chain = chain_name, "backfill worker stopped")
                    }
                }
            }));

            let tailer = LiveTailer::new(chain.clone(), pipeline, self.settings.poll_interval);
            handles.push(tokio::spawn(async move {
                tailer.run().await;
            }));
        }

        tracing::info!(
            chain_count = self.registry.chains().len(),
            testing = self.store.is_none(),
            "bridge indexer started"
        );
    }

    pub fn stop(&self) {
        self.is_running.store(false, Ordering::Release);
        for handle in self.handles.write().drain(..) {
            handle.abort();
        }
        tracing::info!("bridge indexer stopped");
    }
}
