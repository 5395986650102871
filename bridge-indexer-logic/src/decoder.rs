use std::sync::Arc;

use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::{Log, TransactionReceipt},
    sol_types::{SolEvent, SolInterface},
};

use crate::{
    abi::{ERC20, SynapseBridge},
    registry::{ChainContext, NUSD_ETHEREUM, PoolCache, WETH_SYMBOL},
    rpc::RpcError,
    types::{DecodedHalf, Direction, EventKind, InHalf, OutHalf, derive_kappa},
};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown topic {0}")]
    UnknownTopic(B256),
    #[error("malformed log: {0}")]
    MalformedLog(String),
    #[error("no known sent token in receipt of {0}")]
    SentTokenNotFound(B256),
    #[error("decoder did not converge: {0}")]
    NotConverged(String),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl DecodeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(err) if err.is_retryable())
    }
}

impl From<alloy::sol_types::Error> for DecodeError {
    fn from(err: alloy::sol_types::Error) -> Self {
        Self::MalformedLog(err.to_string())
    }
}

/// Turns one raw bridge log into a normalised transaction half.
///
/// Classification is pure; enrichment reads the block timestamp, the
/// originating transaction and its receipt from the chain the log was
/// observed on.
pub struct EventDecoder {
    chain: Arc<ChainContext>,
    pools: PoolCache,
}

impl EventDecoder {
    pub fn new(chain: Arc<ChainContext>, pools: PoolCache) -> Self {
        Self { chain, pools }
    }

    pub async fn decode(&self, log: &Log) -> Result<DecodedHalf, DecodeError> {
        let topic0 = log
            .topic0()
            .ok_or_else(|| DecodeError::MalformedLog("missing topic0".to_string()))?;
        let kind = EventKind::from_topic(topic0).ok_or(DecodeError::UnknownTopic(*topic0))?;

        let tx_hash = log
            .transaction_hash
            .ok_or_else(|| DecodeError::MalformedLog("missing transaction hash".to_string()))?;
        let block_number = log
            .block_number
            .ok_or_else(|| DecodeError::MalformedLog("missing block number".to_string()))?;

        let timestamp = self.chain.rpc.get_block_timestamp(block_number).await?;
        let (from_address, input) = self.chain.rpc.get_transaction(tx_hash).await?;
        // The info from before the bridge wrapped the asset is only visible in
        // the receipt.
        let receipt = self.chain.rpc.get_receipt(tx_hash).await?;

        tracing::debug!(
            chain = self.chain.spec.name,
            event = kind.name(),
            block_number,
            tx_hash = %tx_hash,
            "decoding bridge event"
        );

        match kind.direction() {
            Direction::Out => self
                .decode_out(kind, log, tx_hash, from_address, timestamp, &receipt)
                .map(DecodedHalf::Out),
            Direction::In => self
                .decode_in(kind, log, tx_hash, &input, timestamp, &receipt)
                .await
                .map(DecodedHalf::In),
        }
    }

    fn decode_out(
        &self,
        kind: EventKind,
        log: &Log,
        tx_hash: B256,
        from_address: Address,
        timestamp: u64,
        receipt: &TransactionReceipt,
    ) -> Result<OutHalf, DecodeError> {
        let (to_address, dest_chain) = match kind {
            EventKind::TokenDeposit => {
                let event = log.log_decode::<SynapseBridge::TokenDeposit>()?.inner.data;
                (event.to, event.chainId)
            }
            EventKind::TokenDepositAndSwap => {
                let event = log
                    .log_decode::<SynapseBridge::TokenDepositAndSwap>()?
                    .inner
                    .data;
                (event.to, event.chainId)
            }
            EventKind::TokenRedeem => {
                let event = log.log_decode::<SynapseBridge::TokenRedeem>()?.inner.data;
                (event.to, event.chainId)
            }
            EventKind::TokenRedeemAndSwap => {
                let event = log
                    .log_decode::<SynapseBridge::TokenRedeemAndSwap>()?
                    .inner
                    .data;
                (event.to, event.chainId)
            }
            EventKind::TokenRedeemAndRemove => {
                let event = log
                    .log_decode::<SynapseBridge::TokenRedeemAndRemove>()?
                    .inner
                    .data;
                (event.to, event.chainId)
            }
            other => {
                return Err(DecodeError::NotConverged(format!(
                    "{} is not an OUT event",
                    other.name()
                )));
            }
        };

        let to_chain_id = u64::try_from(dest_chain).map_err(|_| {
            DecodeError::NotConverged(format!("destination chain id {dest_chain} out of range"))
        })?;

        // The event's own token/amount args are unreliable when the bridge
        // wraps a native asset, so the transferred token is recovered from the
        // receipt for every OUT kind.
        let (sent_token, sent_value) = self.find_sent_transfer(receipt, tx_hash)?;

        Ok(OutHalf {
            from_tx_hash: tx_hash,
            from_address,
            to_address,
            sent_value,
            sent_token,
            from_chain_id: self.chain.spec.chain_id,
            to_chain_id,
            sent_time: timestamp,
            kappa: derive_kappa(&tx_hash),
        })
    }

    /// First receipt log whose address is a known token on this chain. On
    /// ethereum a non-WETH token moves via a standard ERC-20 `Transfer`;
    /// everything else is the WETH-style `Deposit` shape whose `data` is the
    /// raw amount word.
    fn find_sent_transfer(
        &self,
        receipt: &TransactionReceipt,
        tx_hash: B256,
    ) -> Result<(Address, U256), DecodeError> {
        for entry in receipt.inner.logs() {
            let address = entry.address();
            let Some(token) = self.chain.token(&address) else {
                continue;
            };

            let value = if self.chain.is_ethereum() && token.symbol != WETH_SYMBOL {
                entry.log_decode::<ERC20::Transfer>()?.inner.data.value
            } else {
                decode_data_word(entry)?
            };

            return Ok((address, value));
        }

        Err(DecodeError::SentTokenNotFound(tx_hash))
    }

    async fn decode_in(
        &self,
        kind: EventKind,
        log: &Log,
        tx_hash: B256,
        input: &[u8],
        timestamp: u64,
        receipt: &TransactionReceipt,
    ) -> Result<InHalf, DecodeError> {
        let to_chain_id = self.chain.spec.chain_id;

        match kind {
            EventKind::TokenMint => {
                let event = log.log_decode::<SynapseBridge::TokenMint>()?.inner.data;
                let token = self.chain.misrepresented_override(event.token);

                let found = search_token_transfer(receipt, token, event.to)?;
                // TokenMint emits `amount` already net of fee; a mismatch means
                // the event names a wrapper while the underlying asset moved.
                let (received_token, received_value) = if found != event.amount {
                    find_transfer_at_most(receipt, event.amount, event.to)?
                } else {
                    (token, found)
                };

                Ok(InHalf {
                    to_tx_hash: tx_hash,
                    to_address: event.to,
                    received_value,
                    received_token,
                    to_chain_id,
                    received_time: timestamp,
                    swap_success: None,
                    kappa: event.kappa,
                })
            }
            EventKind::TokenWithdraw => {
                let event = log.log_decode::<SynapseBridge::TokenWithdraw>()?.inner.data;
                let received_value = event.amount.checked_sub(event.fee).ok_or_else(|| {
                    DecodeError::NotConverged(format!(
                        "fee {} exceeds amount {} in {tx_hash}",
                        event.fee, event.amount
                    ))
                })?;

                Ok(InHalf {
                    to_tx_hash: tx_hash,
                    to_address: event.to,
                    received_value,
                    received_token: self.chain.misrepresented_override(event.token),
                    to_chain_id,
                    received_time: timestamp,
                    swap_success: None,
                    kappa: event.kappa,
                })
            }
            EventKind::TokenMintAndSwap => {
                let event = log
                    .log_decode::<SynapseBridge::TokenMintAndSwap>()?
                    .inner
                    .data;
                let swap = SwapEvent {
                    to_address: event.to,
                    fee: event.fee,
                    token_index_to: event.tokenIndexTo,
                    swap_success: event.swapSuccess,
                    kappa: event.kappa,
                };
                self.decode_in_swap(tx_hash, input, timestamp, receipt, swap)
                    .await
            }
            EventKind::TokenWithdrawAndRemove => {
                let event = log
                    .log_decode::<SynapseBridge::TokenWithdrawAndRemove>()?
                    .inner
                    .data;
                let swap = SwapEvent {
                    to_address: event.to,
                    fee: event.fee,
                    token_index_to: event.swapTokenIndex,
                    swap_success: event.swapSuccess,
                    kappa: event.kappa,
                };
                self.decode_in_swap(tx_hash, input, timestamp, receipt, swap)
                    .await
            }
            other => Err(DecodeError::NotConverged(format!(
                "{} is not an IN event",
                other.name()
            ))),
        }
    }

    /// Shared tail of `TokenMintAndSwap` / `TokenWithdrawAndRemove`: resolve
    /// the pool from the originating transaction input, pick the outcome
    /// token, then read the actually received amount from the receipt.
    async fn decode_in_swap(
        &self,
        tx_hash: B256,
        input: &[u8],
        timestamp: u64,
        receipt: &TransactionReceipt,
        swap: SwapEvent,
    ) -> Result<InHalf, DecodeError> {
        let pool = extract_pool_address(input)?;
        let pool_tokens = self.pools.tokens(&self.chain, pool).await?;

        let received_token = if swap.swap_success {
            pool_tokens
                .get(swap.token_index_to as usize)
                .copied()
                .ok_or_else(|| {
                    DecodeError::NotConverged(format!(
                        "pool {pool} has no token at index {}",
                        swap.token_index_to
                    ))
                })?
        } else if self.chain.is_ethereum() {
            // Nexus assets are not in the ethereum pools.
            NUSD_ETHEREUM
        } else {
            pool_tokens
                .first()
                .copied()
                .ok_or_else(|| DecodeError::NotConverged(format!("pool {pool} has no tokens")))?
        };
        let received_token = self.chain.misrepresented_override(received_token);

        let mut received_value = search_token_transfer(receipt, received_token, swap.to_address)?;
        if !swap.swap_success {
            // The receipt's Transfer carries the gross pre-fee amount when the
            // swap failed.
            received_value = received_value.checked_sub(swap.fee).ok_or_else(|| {
                DecodeError::NotConverged(format!(
                    "fee {} exceeds transferred value {received_value} in {tx_hash}",
                    swap.fee
                ))
            })?;
        }

        Ok(InHalf {
            to_tx_hash: tx_hash,
            to_address: swap.to_address,
            received_value,
            received_token,
            to_chain_id: self.chain.spec.chain_id,
            received_time: timestamp,
            swap_success: Some(swap.swap_success),
            kappa: swap.kappa,
        })
    }
}

/// The fields the two swap-variant IN events share.
struct SwapEvent {
    to_address: Address,
    fee: U256,
    token_index_to: u8,
    swap_success: bool,
    kappa: B256,
}

/// `Transfer` of `token` in the receipt, preferring one addressed to
/// `recipient`.
fn search_token_transfer(
    receipt: &TransactionReceipt,
    token: Address,
    recipient: Address,
) -> Result<U256, DecodeError> {
    let mut fallback = None;

    for log in receipt.inner.logs() {
        if log.address() != token || log.topic0() != Some(&ERC20::Transfer::SIGNATURE_HASH) {
            continue;
        }
        let Ok(decoded) = log.log_decode::<ERC20::Transfer>() else {
            continue;
        };
        let event = decoded.inner.data;
        if event.to == recipient {
            return Ok(event.value);
        }
        if fallback.is_none() {
            fallback = Some(event.value);
        }
    }

    fallback
        .ok_or_else(|| DecodeError::NotConverged(format!("no {token} transfer found in receipt")))
}

/// Reverse-scan the receipt for the first log whose integer-decoded `data`
/// does not exceed `max_value`. A candidate whose `Transfer` recipient equals
/// `recipient` wins over earlier (in reverse order) candidates.
fn find_transfer_at_most(
    receipt: &TransactionReceipt,
    max_value: U256,
    recipient: Address,
) -> Result<(Address, U256), DecodeError> {
    let mut first_candidate = None;

    for log in receipt.inner.logs().iter().rev() {
        let Ok(value) = decode_data_word(log) else {
            continue;
        };
        if value > max_value {
            continue;
        }

        if let Ok(decoded) = log.log_decode::<ERC20::Transfer>() {
            if decoded.inner.data.to == recipient {
                return Ok((log.address(), value));
            }
        }
        if first_candidate.is_none() {
            first_candidate = Some((log.address(), value));
        }
    }

    first_candidate.ok_or_else(|| {
        DecodeError::NotConverged(format!("no receipt log carries a value of at most {max_value}"))
    })
}

fn decode_data_word(log: &Log) -> Result<U256, DecodeError> {
    let data = log.data().data.as_ref();
    if data.len() > 32 {
        return Err(DecodeError::MalformedLog(format!(
            "log data of {} bytes is not an integer word",
            data.len()
        )));
    }
    Ok(U256::from_be_slice(data))
}

/// The pool a swap-variant IN event went through is only present in the
/// originating transaction's calldata.
fn extract_pool_address(input: &[u8]) -> Result<Address, DecodeError> {
    match SynapseBridge::SynapseBridgeCalls::abi_decode(input) {
        Ok(SynapseBridge::SynapseBridgeCalls::mintAndSwap(call)) => Ok(call.pool),
        Ok(SynapseBridge::SynapseBridgeCalls::withdrawAndRemove(call)) => Ok(call.pool),
        Ok(_) => Err(DecodeError::NotConverged(
            "transaction input carries no pool argument".to_string(),
        )),
        Err(err) => Err(DecodeError::NotConverged(format!(
            "cannot decode bridge transaction input: {err}"
        ))),
    }
}
