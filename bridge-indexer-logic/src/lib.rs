pub mod abi;

mod backfill;
mod checkpoint;
mod correlation;
mod decoder;
mod indexer;
mod merge;
mod pipeline;
mod registry;
mod retry;
mod rpc;
mod settings;
mod tailer;
mod types;

#[cfg(test)]
pub mod test_utils;

pub use backfill::BackfillWorker;
pub use checkpoint::{
    CHECKPOINT_NAMESPACE, Checkpoint, CheckpointError, CheckpointStore, InMemoryCheckpointStore,
    RedisCheckpointStore,
};
pub use correlation::{BridgeDatabase, StoreError, UPSERT_CONFLICT_RETRIES};
pub use decoder::{DecodeError, EventDecoder};
pub use indexer::BridgeIndexer;
pub use merge::{TokenDisplay, format_units, merge_half, token_display};
pub use pipeline::{EventPipeline, PipelineError};
pub use registry::*;
pub use retry::{RETRY_ATTEMPTS, Transient, with_retries};
pub use rpc::{RECEIPT_POLL, RECEIPT_WAIT, RpcClient, RpcError};
pub use settings::IndexerSettings;
pub use tailer::LiveTailer;
pub use types::*;
