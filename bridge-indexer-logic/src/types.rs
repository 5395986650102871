use alloy::{
    primitives::{Address, B256, U256, keccak256},
    sol_types::SolEvent,
};

use crate::abi::SynapseBridge;

/// In a bridging scenario there are transactions out of a chain and into a
/// chain. Direction is tracked explicitly because, due to RPC lag, OUT events
/// sometimes appear after their IN counterparts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
}

/// The nine bridge events this indexer recognises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    TokenDeposit,
    TokenDepositAndSwap,
    TokenRedeem,
    TokenRedeemAndSwap,
    TokenRedeemAndRemove,
    TokenMint,
    TokenMintAndSwap,
    TokenWithdraw,
    TokenWithdrawAndRemove,
}

impl EventKind {
    pub fn from_topic(topic: &B256) -> Option<Self> {
        match *topic {
            SynapseBridge::TokenDeposit::SIGNATURE_HASH => Some(Self::TokenDeposit),
            SynapseBridge::TokenDepositAndSwap::SIGNATURE_HASH => Some(Self::TokenDepositAndSwap),
            SynapseBridge::TokenRedeem::SIGNATURE_HASH => Some(Self::TokenRedeem),
            SynapseBridge::TokenRedeemAndSwap::SIGNATURE_HASH => Some(Self::TokenRedeemAndSwap),
            SynapseBridge::TokenRedeemAndRemove::SIGNATURE_HASH => {
                Some(Self::TokenRedeemAndRemove)
            }
            SynapseBridge::TokenMint::SIGNATURE_HASH => Some(Self::TokenMint),
            SynapseBridge::TokenMintAndSwap::SIGNATURE_HASH => Some(Self::TokenMintAndSwap),
            SynapseBridge::TokenWithdraw::SIGNATURE_HASH => Some(Self::TokenWithdraw),
            SynapseBridge::TokenWithdrawAndRemove::SIGNATURE_HASH => {
                Some(Self::TokenWithdrawAndRemove)
            }
            _ => None,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::TokenDeposit
            | Self::TokenDepositAndSwap
            | Self::TokenRedeem
            | Self::TokenRedeemAndSwap
            | Self::TokenRedeemAndRemove => Direction::Out,
            Self::TokenMint
            | Self::TokenMintAndSwap
            | Self::TokenWithdraw
            | Self::TokenWithdrawAndRemove => Direction::In,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TokenDeposit => "TokenDeposit",
            Self::TokenDepositAndSwap => "TokenDepositAndSwap",
            Self::TokenRedeem => "TokenRedeem",
            Self::TokenRedeemAndSwap => "TokenRedeemAndSwap",
            Self::TokenRedeemAndRemove => "TokenRedeemAndRemove",
            Self::TokenMint => "TokenMint",
            Self::TokenMintAndSwap => "TokenMintAndSwap",
            Self::TokenWithdraw => "TokenWithdraw",
            Self::TokenWithdrawAndRemove => "TokenWithdrawAndRemove",
        }
    }

    /// All nine topic0 values, in the shape `eth_getLogs` filters expect.
    pub fn all_topics() -> Vec<B256> {
        vec![
            SynapseBridge::TokenDeposit::SIGNATURE_HASH,
            SynapseBridge::TokenDepositAndSwap::SIGNATURE_HASH,
            SynapseBridge::TokenRedeem::SIGNATURE_HASH,
            SynapseBridge::TokenRedeemAndSwap::SIGNATURE_HASH,
            SynapseBridge::TokenRedeemAndRemove::SIGNATURE_HASH,
            SynapseBridge::TokenMint::SIGNATURE_HASH,
            SynapseBridge::TokenMintAndSwap::SIGNATURE_HASH,
            SynapseBridge::TokenWithdraw::SIGNATURE_HASH,
            SynapseBridge::TokenWithdrawAndRemove::SIGNATURE_HASH,
        ]
    }
}

/// The kappa of an OUT event is not carried by the event itself: it is the
/// keccak hash of the ASCII rendering of the source transaction hash
/// (lowercase, `0x`-prefixed), which is what the destination-side validators
/// compute and pass to `mint`/`withdraw`.
pub fn derive_kappa(tx_hash: &B256) -> B256 {
    keccak256(tx_hash.to_string().as_bytes())
}

/// Source-chain side of a bridge transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutHalf {
    pub from_tx_hash: B256,
    pub from_address: Address,
    pub to_address: Address,
    pub sent_value: U256,
    pub sent_token: Address,
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub sent_time: u64,
    pub kappa: B256,
}

/// Destination-chain side of a bridge transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InHalf {
    pub to_tx_hash: B256,
    pub to_address: Address,
    pub received_value: U256,
    pub received_token: Address,
    pub to_chain_id: u64,
    pub received_time: u64,
    pub swap_success: Option<bool>,
    pub kappa: B256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedHalf {
    Out(OutHalf),
    In(InHalf),
}

impl DecodedHalf {
    pub fn kappa(&self) -> B256 {
        match self {
            Self::Out(half) => half.kappa,
            Self::In(half) => half.kappa,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Out(_) => Direction::Out,
            Self::In(_) => Direction::In,
        }
    }
}
