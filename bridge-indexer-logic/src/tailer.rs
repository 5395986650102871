use std::{sync::Arc, time::Duration};

use alloy::{
    eips::BlockNumberOrTag,
    providers::Provider,
    rpc::types::Filter,
};
use futures::StreamExt;

use crate::{
    pipeline::EventPipeline,
    registry::ChainContext,
    retry::with_retries,
    rpc::RpcError,
    types::EventKind,
};

/// Live log subscription for one chain, starting at the current head.
///
/// The tailer never touches the durable checkpoint: the backfill worker is
/// that cursor's single writer, and the kappa-keyed upsert makes overlap
/// between the two harmless.
pub struct LiveTailer {
    chain: Arc<ChainContext>,
    pipeline: Arc<EventPipeline>,
    poll_interval: Duration,
}

impl LiveTailer {
    pub fn new(
        chain: Arc<ChainContext>,
        pipeline: Arc<EventPipeline>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain,
            pipeline,
            poll_interval,
        }
    }

    /// Poll forever, re-subscribing whenever the node drops the filter.
    pub async fn run(&self) {
        let chain = self.chain.spec.name;
        loop {
            match self.tail_once().await {
                Ok(()) => tracing::warn!(chain, "log filter stream ended, re-subscribing"),
                Err(err) => {
                    tracing::error!(err = %err, chain, "log subscription failed, re-subscribing")
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn tail_once(&self) -> Result<(), RpcError> {
        let spec = self.chain.spec;
        let filter = Filter::new()
            .address(spec.bridge)
            .event_signature(EventKind::all_topics())
            .from_block(BlockNumberOrTag::Latest);

        let poller = self
            .chain
            .rpc
            .provider()
            .watch_logs(&filter)
            .await
            .map_err(RpcError::from_transport)?;

        tracing::info!(chain = spec.name, "live tailer subscribed");

        let mut stream = poller
            .with_poll_interval(self.poll_interval)
            .into_stream();

        while let Some(logs) = stream.next().await {
            for log in &logs {
                tracing::debug!(
                    chain = spec.name,
                    tx_hash = ?log.transaction_hash,
                    "new live log"
                );
                with_retries("process_live_log", || self.pipeline.process(log)).await;
            }
        }

        Ok(())
    }
}
