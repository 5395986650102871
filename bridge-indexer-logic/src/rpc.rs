use std::time::Duration;

use alloy::{
    consensus::Transaction as _,
    network::Ethereum,
    primitives::{Address, B256, Bytes},
    providers::{DynProvider, Provider},
    rpc::types::{Filter, Log, TransactionReceipt},
    transports::TransportError,
};

use crate::registry::ChainSpec;

/// Receipt availability is bounded: nodes occasionally answer `eth_getLogs`
/// before the receipt of the same transaction is queryable.
pub const RECEIPT_WAIT: Duration = Duration::from_secs(10);
pub const RECEIPT_POLL: Duration = Duration::from_millis(500);

#[derive(Clone, Debug, thiserror::Error)]
pub enum RpcError {
    #[error("node unavailable: {0}")]
    NodeUnavailable(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("contract logic error: {0}")]
    Logic(String),
    #[error("bad response: {0}")]
    BadResponse(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
}

impl RpcError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NodeUnavailable(_) | Self::RateLimited(_) | Self::Timeout(_)
        )
    }

    pub(crate) fn from_transport(err: TransportError) -> Self {
        match err {
            TransportError::ErrorResp(payload) => {
                let message = payload.to_string();
                let lowered = message.to_lowercase();
                if payload.code == 3 || lowered.contains("revert") {
                    Self::Logic(message)
                } else if payload.code == -32005
                    || lowered.contains("rate limit")
                    || lowered.contains("too many requests")
                {
                    Self::RateLimited(message)
                } else {
                    Self::BadResponse(message)
                }
            }
            TransportError::Transport(kind) => Self::NodeUnavailable(kind.to_string()),
            TransportError::SerError(err) => Self::BadResponse(err.to_string()),
            TransportError::DeserError { err, .. } => Self::BadResponse(err.to_string()),
            TransportError::NullResp => Self::BadResponse("null response".to_string()),
            TransportError::UnsupportedFeature(feature) => Self::BadResponse(feature.to_string()),
            TransportError::LocalUsageError(err) => Self::BadResponse(err.to_string()),
        }
    }

    pub(crate) fn from_contract(err: alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(err) => Self::from_transport(err),
            other => Self::BadResponse(other.to_string()),
        }
    }
}

/// Typed access to one chain's node.
///
/// The decode/call half of the adapter surface lives in the `sol!`-generated
/// bindings (`abi` module); this wrapper covers the raw JSON-RPC operations
/// and normalises their failures into [`RpcError`].
#[derive(Clone)]
pub struct RpcClient {
    chain: &'static str,
    max_blocks: u64,
    provider: DynProvider<Ethereum>,
}

impl RpcClient {
    pub fn new(spec: &ChainSpec, provider: DynProvider<Ethereum>) -> Self {
        Self {
            chain: spec.name,
            max_blocks: spec.max_blocks,
            provider,
        }
    }

    pub fn provider(&self) -> &DynProvider<Ethereum> {
        &self.provider
    }

    pub async fn block_number(&self) -> Result<u64, RpcError> {
        self.provider
            .get_block_number()
            .await
            .map_err(RpcError::from_transport)
    }

    /// Fetch logs for `[from_block, to_block]` (inclusive), sorted by
    /// `(block_number, transaction_index)`.
    ///
    /// Windows wider than the chain's `eth_getLogs` limit are rejected here
    /// rather than clipped, so a caller bug cannot silently skip blocks.
    pub async fn get_logs(
        &self,
        address: Address,
        topics: Vec<B256>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, RpcError> {
        if to_block < from_block {
            return Err(RpcError::BadResponse(format!(
                "inverted log window {from_block}..={to_block}"
            )));
        }
        if to_block - from_block > self.max_blocks {
            return Err(RpcError::BadResponse(format!(
                "log window {from_block}..={to_block} exceeds the {} node's {}-block limit",
                self.chain, self.max_blocks
            )));
        }

        let filter = Filter::new()
            .address(address)
            .event_signature(topics)
            .from_block(from_block)
            .to_block(to_block);

        let mut logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(RpcError::from_transport)?;

        // Some nodes do not bother sorting events chronologically.
        logs.sort_by_key(|log| (log.block_number, log.transaction_index));
        Ok(logs)
    }

    pub async fn get_block_timestamp(&self, number: u64) -> Result<u64, RpcError> {
        let block = self
            .provider
            .get_block_by_number(number.into())
            .await
            .map_err(RpcError::from_transport)?
            .ok_or_else(|| {
                RpcError::BadResponse(format!("block {number} not found on {}", self.chain))
            })?;
        Ok(block.header.timestamp)
    }

    /// Sender and calldata of a transaction.
    pub async fn get_transaction(&self, hash: B256) -> Result<(Address, Bytes), RpcError> {
        let tx = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .map_err(RpcError::from_transport)?
            .ok_or_else(|| {
                RpcError::BadResponse(format!("transaction {hash} not found on {}", self.chain))
            })?;
        Ok((tx.inner.signer(), tx.input().clone()))
    }

    /// Wait for the receipt of `hash`, polling every [`RECEIPT_POLL`] for at
    /// most [`RECEIPT_WAIT`].
    pub async fn get_receipt(&self, hash: B256) -> Result<TransactionReceipt, RpcError> {
        let deadline = tokio::time::Instant::now() + RECEIPT_WAIT;
        loop {
            if let Some(receipt) = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(RpcError::from_transport)?
            {
                return Ok(receipt);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RpcError::Timeout(format!(
                    "receipt of {hash} on {}",
                    self.chain
                )));
            }
            tokio::time::sleep(RECEIPT_POLL).await;
        }
    }
}
