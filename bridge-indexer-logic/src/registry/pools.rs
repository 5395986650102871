use std::sync::Arc;

use alloy::{
    network::Ethereum,
    primitives::{Address, U256, address},
    providers::DynProvider,
};
use moka::future::Cache;

use crate::{
    abi::{BasePool, BridgeConfig},
    registry::ChainContext,
    rpc::RpcError,
};

/// The global BridgeConfig directory contract, deployed on ethereum.
pub const BRIDGE_CONFIG_ADDRESS: Address = address!("ae908bb4905bca9bde0656cc869d0f23e77875e7");

/// Process-lifetime cache of pool token lists, keyed by (chain id, pool).
/// Concurrent loads of the same pool are deduplicated.
#[derive(Clone)]
pub struct PoolCache {
    inner: Cache<(u64, Address), Arc<Vec<Address>>>,
}

impl PoolCache {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().build(),
        }
    }

    /// Ordered token list of `pool`, enumerated on first use.
    pub async fn tokens(
        &self,
        chain: &ChainContext,
        pool: Address,
    ) -> Result<Arc<Vec<Address>>, RpcError> {
        self.inner
            .try_get_with(
                (chain.spec.chain_id, pool),
                async { enumerate_pool_tokens(chain, pool).await.map(Arc::new) },
            )
            .await
            .map_err(|err: Arc<RpcError>| (*err).clone())
    }

    pub async fn seed(&self, chain_id: u64, pool: Address, tokens: Vec<Address>) {
        self.inner.insert((chain_id, pool), Arc::new(tokens)).await;
    }
}

impl Default for PoolCache {
    fn default() -> Self {
        Self::new()
    }
}

/// `getToken(i)` for ascending `i` until the call reverts. The revert is the
/// expected terminator of the enumeration, not an error.
async fn enumerate_pool_tokens(
    chain: &ChainContext,
    pool: Address,
) -> Result<Vec<Address>, RpcError> {
    let contract = BasePool::new(pool, chain.rpc.provider().clone());
    let mut tokens = Vec::new();

    for index in 0..=u8::MAX {
        match contract.getToken(index).call().await {
            Ok(token) => tokens.push(token),
            Err(err) => match RpcError::from_contract(err) {
                RpcError::Logic(_) => break,
                other => return Err(other),
            },
        }
    }

    tracing::debug!(
        chain = chain.spec.name,
        pool = %pool,
        count = tokens.len(),
        "enumerated pool tokens"
    );
    Ok(tokens)
}

/// Record returned by the directory for a (symbol, chain) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeTokenInfo {
    pub chain_id: U256,
    pub token_address: Address,
    pub decimals: u8,
    pub max_swap: U256,
    pub min_swap: U256,
    pub swap_fee: U256,
    pub min_swap_fee: U256,
    pub max_swap_fee: U256,
    pub has_underlying: bool,
    pub is_underlying: bool,
}

/// Read-only client of the on-chain BridgeConfig directory.
#[derive(Clone)]
pub struct BridgeConfigClient {
    provider: DynProvider<Ethereum>,
}

impl BridgeConfigClient {
    pub fn new(provider: DynProvider<Ethereum>) -> Self {
        Self { provider }
    }

    pub async fn token_id(&self, token: Address, chain_id: u64) -> Result<String, RpcError> {
        BridgeConfig::new(BRIDGE_CONFIG_ADDRESS, self.provider.clone())
            .getTokenID(token, U256::from(chain_id))
            .call()
            .await
            .map_err(RpcError::from_contract)
    }

    /// `None` when the directory answers with its all-zero "not found"
    /// record.
    pub async fn bridge_token(
        &self,
        token_id: &str,
        chain_id: u64,
    ) -> Result<Option<BridgeTokenInfo>, RpcError> {
        let token = BridgeConfig::new(BRIDGE_CONFIG_ADDRESS, self.provider.clone())
            .getToken(token_id.to_string(), U256::from(chain_id))
            .call()
            .await
            .map_err(RpcError::from_contract)?;

        if token.tokenAddress == Address::ZERO {
            return Ok(None);
        }

        Ok(Some(BridgeTokenInfo {
            chain_id: token.chainId,
            token_address: token.tokenAddress,
            decimals: token.tokenDecimals,
            max_swap: token.maxSwap,
            min_swap: token.minSwap,
            swap_fee: token.swapFee,
            min_swap_fee: token.minSwapFee,
            max_swap_fee: token.maxSwapFee,
            has_underlying: token.hasUnderlying,
            is_underlying: token.isUnderlying,
        }))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_utils::{bsc_spec, encode_address_word, mock_chain_context};

    #[tokio::test]
    async fn pool_enumeration_stops_at_the_first_revert() {
        let (asserter, chain) = mock_chain_context(bsc_spec(), []);
        let pool = address!("28ec0b36f0819ecb5005cab836f4ed5a2eca4d13");
        let nusd = address!("23b891e5c62e0955ae2bd185990103928ab817b3");
        let busd = address!("e9e7cea3dedca5984780bafc599bd69add087d56");

        asserter.push_success(&encode_address_word(&nusd));
        asserter.push_success(&encode_address_word(&busd));
        asserter.push_failure_msg("execution reverted");

        let cache = PoolCache::new();
        let tokens = cache.tokens(&chain, pool).await.unwrap();
        assert_eq!(*tokens, vec![nusd, busd]);

        // Second read is served from the cache, no responses queued.
        let tokens = cache.tokens(&chain, pool).await.unwrap();
        assert_eq!(*tokens, vec![nusd, busd]);
    }

    #[tokio::test]
    async fn bridge_token_zero_record_means_not_found() {
        let (asserter, chain) = mock_chain_context(bsc_spec(), []);
        let client = BridgeConfigClient::new(chain.rpc.provider().clone());

        // Ten zero words: the directory's default return for unknown pairs.
        asserter.push_success(&format!("0x{}", "00".repeat(320)));
        let found = client.bridge_token("nUSD", 56).await.unwrap();
        assert_eq!(found, None);

        // A populated record round-trips into BridgeTokenInfo.
        let token_address = address!("23b891e5c62e0955ae2bd185990103928ab817b3");
        let mut words = vec!["00".repeat(32); 10];
        words[0] = format!("{:064x}", 56); // chainId
        words[1] = encode_address_word(&token_address)
            .trim_start_matches("0x")
            .to_string();
        words[2] = format!("{:064x}", 18); // tokenDecimals
        words[8] = format!("{:064x}", 1); // hasUnderlying
        asserter.push_success(&format!("0x{}", words.concat()));

        let found = client.bridge_token("nUSD", 56).await.unwrap().unwrap();
        assert_eq!(found.token_address, token_address);
        assert_eq!(found.decimals, 18);
        assert_eq!(found.chain_id, U256::from(56));
        assert!(found.has_underlying);
        assert!(!found.is_underlying);
    }
}
