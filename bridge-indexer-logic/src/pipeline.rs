use std::sync::Arc;

use alloy::rpc::types::Log;

use crate::{
    correlation::{BridgeDatabase, StoreError},
    decoder::{DecodeError, EventDecoder},
    merge,
    registry::{ChainContext, PoolCache},
    types::DecodedHalf,
};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Decode(err) => err.is_retryable(),
            Self::Store(err) => err.is_retryable(),
        }
    }
}

/// Decode-then-upsert unit for one chain, shared by the backfill worker and
/// the live tailer. Without a store (TESTING mode) events are decoded and
/// logged only.
pub struct EventPipeline {
    chain: Arc<ChainContext>,
    decoder: EventDecoder,
    store: Option<BridgeDatabase>,
}

impl EventPipeline {
    pub fn new(
        chain: Arc<ChainContext>,
        pools: PoolCache,
        store: Option<BridgeDatabase>,
    ) -> Self {
        Self {
            decoder: EventDecoder::new(chain.clone(), pools),
            chain,
            store,
        }
    }

    pub async fn process(&self, log: &Log) -> Result<DecodedHalf, PipelineError> {
        let half = self.decoder.decode(log).await?;

        match &self.store {
            Some(store) => {
                let display = merge::token_display(&self.chain, &half);
                store.upsert(&half, &display).await?;
            }
            None => tracing::info!(
                chain = self.chain.spec.name,
                kappa = %half.kappa(),
                "persistence disabled, dropping decoded half"
            ),
        }

        Ok(half)
    }
}
