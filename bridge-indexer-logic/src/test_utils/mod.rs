use std::sync::Arc;

use alloy::{
    network::Ethereum,
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    transports::mock::Asserter,
};
use blockscout_service_launcher::test_database::TestDbGuard;
use serde_json::{Value, json};

use crate::{
    registry::{ChainContext, ChainSpec, TokenMetadata, chain_spec},
    rpc::RpcClient,
};

pub fn ethereum_spec() -> &'static ChainSpec {
    chain_spec("ethereum").expect("builtin chain")
}

pub fn bsc_spec() -> &'static ChainSpec {
    chain_spec("bsc").expect("builtin chain")
}

pub fn avalanche_spec() -> &'static ChainSpec {
    chain_spec("avalanche").expect("builtin chain")
}

/// A throwaway chain spec for worker tests, where the builtin first blocks
/// would get in the way.
pub fn leaked_spec(
    name: &'static str,
    chain_id: u64,
    first_block: u64,
    max_blocks: u64,
) -> &'static ChainSpec {
    Box::leak(Box::new(ChainSpec {
        name,
        chain_id,
        bridge: alloy::primitives::address!("d123f70ae324d34a9e76b67a27bf77593ba8749f"),
        nusd_pool: None,
        neth_pool: None,
        first_block,
        max_blocks,
        rpc_env: "TEST_RPC",
    }))
}

pub fn token_metadata(name: &str, symbol: &str, decimals: u8) -> TokenMetadata {
    TokenMetadata {
        name: name.to_string(),
        symbol: symbol.to_string(),
        decimals,
    }
}

/// Build a `DynProvider<Ethereum>` over a mock `Asserter`. The asserter is
/// returned so the test can queue expected responses.
pub fn mock_provider() -> (Asserter, DynProvider<Ethereum>) {
    let asserter = Asserter::new();
    let provider = ProviderBuilder::new()
        .connect_mocked_client(asserter.clone())
        .erased();
    (asserter, provider)
}

pub fn mock_rpc_client(spec: &'static ChainSpec) -> (Asserter, RpcClient) {
    let (asserter, provider) = mock_provider();
    (asserter, RpcClient::new(spec, provider))
}

pub fn mock_chain_context(
    spec: &'static ChainSpec,
    tokens: impl IntoIterator<Item = (Address, TokenMetadata)>,
) -> (Asserter, Arc<ChainContext>) {
    let (asserter, provider) = mock_provider();
    let context = ChainContext {
        spec,
        rpc: RpcClient::new(spec, provider),
        tokens: tokens.into_iter().collect(),
    };
    (asserter, Arc::new(context))
}

pub fn encode_u256_word(value: U256) -> String {
    format!("0x{:0>64}", format!("{value:x}"))
}

pub fn encode_address_word(address: &Address) -> String {
    format!("0x{:0>64}", format!("{address:x}"))
}

pub fn address_topic(address: &Address) -> B256 {
    B256::left_padding_from(address.as_slice())
}

pub fn log_json(
    address: &Address,
    topics: &[B256],
    data: &str,
    block_number: u64,
    tx_hash: &B256,
    tx_index: u64,
    log_index: u64,
) -> Value {
    json!({
        "address": format!("{address:#x}"),
        "topics": topics.iter().map(|t| format!("{t:#x}")).collect::<Vec<_>>(),
        "data": data,
        "blockNumber": format!("0x{block_number:x}"),
        "transactionHash": format!("{tx_hash:#x}"),
        "transactionIndex": format!("0x{tx_index:x}"),
        "blockHash": format!("{:#x}", B256::repeat_byte(0xbb)),
        "logIndex": format!("0x{log_index:x}"),
        "removed": false,
    })
}

pub fn block_json(number: u64, timestamp: u64) -> Value {
    let zero_hash = format!("{:#x}", B256::ZERO);
    json!({
        "hash": format!("{:#x}", B256::repeat_byte(0xbb)),
        "parentHash": zero_hash,
        "sha3Uncles": zero_hash,
        "miner": format!("{:#x}", Address::ZERO),
        "stateRoot": zero_hash,
        "transactionsRoot": zero_hash,
        "receiptsRoot": zero_hash,
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "difficulty": "0x0",
        "number": format!("0x{number:x}"),
        "gasLimit": "0x1c9c380",
        "gasUsed": "0x0",
        "timestamp": format!("0x{timestamp:x}"),
        "extraData": "0x",
        "mixHash": zero_hash,
        "nonce": "0x0000000000000000",
        "totalDifficulty": "0x0",
        "size": "0x0",
        "transactions": [],
        "uncles": [],
    })
}

pub fn transaction_json(
    hash: &B256,
    from: &Address,
    to: &Address,
    input: &str,
    block_number: u64,
) -> Value {
    json!({
        "hash": format!("{hash:#x}"),
        "nonce": "0x0",
        "blockHash": format!("{:#x}", B256::repeat_byte(0xbb)),
        "blockNumber": format!("0x{block_number:x}"),
        "transactionIndex": "0x0",
        "from": format!("{from:#x}"),
        "to": format!("{to:#x}"),
        "value": "0x0",
        "gas": "0x5208",
        "gasPrice": "0x1",
        "input": input,
        "type": "0x0",
        "chainId": "0x1",
        "v": "0x1b",
        "r": "0x1",
        "s": "0x1",
    })
}

pub fn receipt_json(tx_hash: &B256, to: &Address, block_number: u64, logs: Vec<Value>) -> Value {
    json!({
        "transactionHash": format!("{tx_hash:#x}"),
        "transactionIndex": "0x0",
        "blockHash": format!("{:#x}", B256::repeat_byte(0xbb)),
        "blockNumber": format!("0x{block_number:x}"),
        "from": format!("{:#x}", Address::ZERO),
        "to": format!("{to:#x}"),
        "cumulativeGasUsed": "0x0",
        "gasUsed": "0x0",
        "contractAddress": null,
        "logs": logs,
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "status": "0x1",
        "type": "0x0",
        "effectiveGasPrice": "0x0",
    })
}

pub async fn init_db(name: &str) -> TestDbGuard {
    TestDbGuard::new::<migration::Migrator>(name).await
}
