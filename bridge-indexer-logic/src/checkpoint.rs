use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;
use redis::{AsyncCommands, aio::MultiplexedConnection};

/// Namespace under which the log workers keep their cursors.
pub const CHECKPOINT_NAMESPACE: &str = "logs";

/// Durable cursor of a (chain, bridge address) worker: the last block it
/// fully processed and the transaction index of the last committed log in
/// that block. `tx_index` may be stale relative to `max_block_stored`; the
/// backfill worker drops duplicates accordingly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub max_block_stored: u64,
    pub tx_index: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error("malformed checkpoint value {0:?}")]
    Malformed(String),
}

#[async_trait]
pub trait CheckpointStore: Send + Sync + 'static {
    async fn load(
        &self,
        chain: &str,
        namespace: &str,
        address: &Address,
    ) -> Result<Option<Checkpoint>, CheckpointError>;

    async fn advance(
        &self,
        chain: &str,
        namespace: &str,
        address: &Address,
        block: u64,
        tx_index: u64,
    ) -> Result<(), CheckpointError>;
}

fn block_key(chain: &str, namespace: &str, address: &Address) -> String {
    format!("{chain}:{namespace}:{address:#x}:MAX_BLOCK_STORED")
}

fn index_key(chain: &str, namespace: &str, address: &Address) -> String {
    format!("{chain}:{namespace}:{address:#x}:TX_INDEX")
}

/// Redis-backed checkpoint store: two string-encoded integers per cursor.
/// The two keys are not written atomically; readers tolerate the skew.
#[derive(Clone)]
pub struct RedisCheckpointStore {
    con: MultiplexedConnection,
}

impl RedisCheckpointStore {
    pub async fn connect(url: &str) -> Result<Self, CheckpointError> {
        let client = redis::Client::open(url)?;
        let con = client.get_multiplexed_async_connection().await?;
        Ok(Self { con })
    }
}

#[async_trait]
impl CheckpointStore for RedisCheckpointStore {
    async fn load(
        &self,
        chain: &str,
        namespace: &str,
        address: &Address,
    ) -> Result<Option<Checkpoint>, CheckpointError> {
        let mut con = self.con.clone();

        let block: Option<String> = con.get(block_key(chain, namespace, address)).await?;
        let Some(block) = block else {
            return Ok(None);
        };
        let max_block_stored = block
            .parse()
            .map_err(|_| CheckpointError::Malformed(block.clone()))?;

        let index: Option<String> = con.get(index_key(chain, namespace, address)).await?;
        let tx_index = index
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| CheckpointError::Malformed(value.clone()))
            })
            .transpose()?;

        Ok(Some(Checkpoint {
            max_block_stored,
            tx_index,
        }))
    }

    async fn advance(
        &self,
        chain: &str,
        namespace: &str,
        address: &Address,
        block: u64,
        tx_index: u64,
    ) -> Result<(), CheckpointError> {
        let mut con = self.con.clone();
        con.set::<_, _, ()>(block_key(chain, namespace, address), block.to_string())
            .await?;
        con.set::<_, _, ()>(index_key(chain, namespace, address), tx_index.to_string())
            .await?;
        Ok(())
    }
}

/// Checkpoints that die with the process. Used by tests and by TESTING mode,
/// where persistence is disabled.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    inner: Arc<Mutex<HashMap<String, Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(
        &self,
        chain: &str,
        namespace: &str,
        address: &Address,
    ) -> Result<Option<Checkpoint>, CheckpointError> {
        let key = block_key(chain, namespace, address);
        Ok(self.inner.lock().get(&key).copied())
    }

    async fn advance(
        &self,
        chain: &str,
        namespace: &str,
        address: &Address,
        block: u64,
        tx_index: u64,
    ) -> Result<(), CheckpointError> {
        let key = block_key(chain, namespace, address);
        self.inner.lock().insert(
            key,
            Checkpoint {
                max_block_stored: block,
                tx_index: Some(tx_index),
            },
        );
        Ok(())
    }
}
