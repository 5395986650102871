mod pools;

pub use pools::{BRIDGE_CONFIG_ADDRESS, BridgeConfigClient, BridgeTokenInfo, PoolCache};

use std::collections::HashMap;

use alloy::{
    network::Ethereum,
    primitives::{Address, address},
    providers::{DynProvider, Provider, ProviderBuilder},
};
use anyhow::{Context, bail};
use futures::{StreamExt, TryStreamExt, stream};
use lazy_static::lazy_static;
use std::sync::Arc;

use crate::{abi::ERC20, rpc::RpcClient};

/// Startup fan-out bound for `decimals()`/`name()`/`symbol()` reads.
pub const METADATA_FETCH_CONCURRENCY: usize = 24;

/// nUSD on ethereum. Failed swaps on ethereum always pay out the nexus asset,
/// which never sits in the ethereum pools.
pub const NUSD_ETHEREUM: Address = address!("1b84765de8b7566e4ceaf4d0fd3c5af52d3dde4f");

pub const WETH_SYMBOL: &str = "WETH";

/// Static description of one chain: where the bridge lives, where scanning
/// starts, and how wide an `eth_getLogs` window its nodes accept.
#[derive(Debug)]
pub struct ChainSpec {
    pub name: &'static str,
    pub chain_id: u64,
    pub bridge: Address,
    pub nusd_pool: Option<Address>,
    pub neth_pool: Option<Address>,
    pub first_block: u64,
    pub max_blocks: u64,
    pub rpc_env: &'static str,
}

/// `eth_getLogs` window limits, by chain name. The defaults exist because the
/// corresponding nodes reject larger windows outright.
pub fn get_logs_window(chain: &str) -> u64 {
    match chain {
        "ethereum" | "harmony" | "moonriver" | "moonbeam" => 1024,
        "cronos" => 2000,
        "boba" | "bsc" => 512,
        _ => 2048,
    }
}

lazy_static! {
    pub static ref CHAINS: Vec<ChainSpec> = vec![
        ChainSpec {
            name: "ethereum",
            chain_id: 1,
            bridge: address!("2796317b0ff8538f253012862c06787adfb8ceb6"),
            nusd_pool: Some(address!("1116898dda4015ed8ddefb84b6e8bc24528af2d8")),
            neth_pool: None,
            first_block: 13_566_427,
            max_blocks: get_logs_window("ethereum"),
            rpc_env: "ETH_RPC",
        },
        ChainSpec {
            name: "bsc",
            chain_id: 56,
            bridge: address!("d123f70ae324d34a9e76b67a27bf77593ba8749f"),
            nusd_pool: Some(address!("28ec0b36f0819ecb5005cab836f4ed5a2eca4d13")),
            neth_pool: None,
            first_block: 12_431_591,
            max_blocks: get_logs_window("bsc"),
            rpc_env: "BSC_RPC",
        },
        ChainSpec {
            name: "avalanche",
            chain_id: 43114,
            bridge: address!("c05e61d0e7a63d27546389b7ad62fdff5a91aace"),
            nusd_pool: Some(address!("ed2a7edd7413021d440b09d654f3b87712abab66")),
            neth_pool: None,
            first_block: 6_619_002,
            max_blocks: get_logs_window("avalanche"),
            rpc_env: "AVAX_RPC",
        },
    ];

    /// Tokens whose metadata is read at startup, per chain.
    static ref TOKENS: HashMap<&'static str, Vec<Address>> = HashMap::from([
        (
            "ethereum",
            vec![
                address!("71ab77b7dbb4fa7e017bc15090b2163221420282"), // HIGH
                address!("0f2d719407fdbeff09d87557abb7232601fd9f29"), // SYN
                address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"), // WETH
                address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"), // USDC
                address!("6b175474e89094c44da98b954eedeac495271d0f"), // DAI
                address!("dac17f958d2ee523a2206206994597c13d831ec7"), // USDT
                address!("1b84765de8b7566e4ceaf4d0fd3c5af52d3dde4f"), // nUSD
                address!("baac2b4491727d78d2b78815144570b9f2fe8899"), // DOG
                address!("853d955acef822db058eb8505911ed77f175b99e"), // FRAX
                address!("ca76543cf381ebbb277be79574059e32108e3e65"), // wsOHM
                address!("0ab87046fbb341d058f17cbc4c1133f25a20a52f"), // gOHM
                address!("0261018aa50e28133c1ae7a29ebdf9bd21b878cb"), // UST
                address!("98585dfc8d9e7d48f0b1ae47ce33332cf4237d96"), // NEWO
                address!("73968b9a57c6e53d41345fd57a6e6ae27d6cdb2f"), // SDT
                address!("02b5453d92b730f29a86a0d5ef6e930c4cf8860b"), // USDB
            ],
        ),
        (
            "bsc",
            vec![
                address!("23b891e5c62e0955ae2bd185990103928ab817b3"), // nUSD
                address!("f0b8b631145d393a767b4387d08aa09969b2dfed"), // USD-LP
                address!("e9e7cea3dedca5984780bafc599bd69add087d56"), // BUSD
                address!("8ac76a51cc950d9822d68b83fe1ad97b32cd580d"), // USDC
                address!("aa88c603d142c371ea0eac8756123c5805edee03"), // DOG
                address!("55d398326f99059ff775485246999027b3197955"), // USDT
                address!("5f4bde007dc06b867f86ebfe4802e34a1ffeed63"), // HIGH
                address!("a4080f1778e69467e905b8d6f72f6e441f9e9484"), // SYN
                address!("42f6f551ae042cbe50c739158b4f0cac0edb9096"), // NRV
                address!("130025ee738a66e691e6a7a62381cb33c6d9ae83"), // JUMP
                address!("0fe9778c005a5a6115cbe12b0568a2d50b765a51"), // NFD
                address!("c13b7a43223bb9bf4b69bd68ab20ca1b79d81c75"), // JGN
                address!("88918495892baf4536611e38e75d771dc6ec0863"), // gOHM
                address!("b7a6c5f0cc98d24cf4b2011842e64316ff6d042c"), // UST
                address!("c8699abbba90c7479dedccef19ef78969a2fc608"), // USDB
            ],
        ),
    ]);

    /// Event-reported wrappers mapped to the asset that actually moves.
    /// GMX on avalanche is not ERC-20 compatible, so the bridge reports its
    /// wrapper.
    pub static ref MISREPRESENTED_TOKENS: HashMap<(&'static str, Address), Address> =
        HashMap::from([(
            ("avalanche", address!("20a9dc684b4d0407ef8c9a302beaaa18ee15f656")),
            address!("62edc0692bd897d2295872a9ffcac5425011c661"),
        )]);
}

pub fn chain_spec(name: &str) -> Option<&'static ChainSpec> {
    CHAINS.iter().find(|spec| spec.name == name)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Per-chain runtime state: the connected client plus the token metadata read
/// once at startup. Read-only after bootstrap.
pub struct ChainContext {
    pub spec: &'static ChainSpec,
    pub rpc: RpcClient,
    pub tokens: HashMap<Address, TokenMetadata>,
}

impl ChainContext {
    pub fn token(&self, address: &Address) -> Option<&TokenMetadata> {
        self.tokens.get(address)
    }

    pub fn is_ethereum(&self) -> bool {
        self.spec.chain_id == 1
    }

    pub fn misrepresented_override(&self, token: Address) -> Address {
        MISREPRESENTED_TOKENS
            .get(&(self.spec.name, token))
            .copied()
            .unwrap_or(token)
    }
}

/// All per-chain state plus the process-wide pool cache and the global
/// bridge-config directory. Built once at startup; a bootstrap failure is
/// fatal to the process.
pub struct ChainRegistry {
    chains: Vec<Arc<ChainContext>>,
    pools: PoolCache,
    bridge_config: Option<BridgeConfigClient>,
}

impl ChainRegistry {
    /// Connect every chain that has an RPC URL configured in the environment
    /// and read the token metadata for each.
    pub async fn bootstrap() -> anyhow::Result<Self> {
        let mut chains = Vec::new();

        for spec in CHAINS.iter() {
            let Ok(url) = std::env::var(spec.rpc_env) else {
                tracing::warn!(
                    chain = spec.name,
                    env = spec.rpc_env,
                    "no RPC url configured, chain disabled"
                );
                continue;
            };

            // alloy tolerates the oversized extraData of PoA chains, so
            // non-ethereum chains need no dedicated middleware here.
            let provider = ProviderBuilder::new()
                .connect_http(url.parse().with_context(|| {
                    format!("invalid RPC url in {} for {}", spec.rpc_env, spec.name)
                })?)
                .erased();

            let reported = provider
                .get_chain_id()
                .await
                .with_context(|| format!("failed to connect to the {} node", spec.name))?;
            if reported != spec.chain_id {
                bail!(
                    "{} node reports chain id {reported}, expected {}",
                    spec.name,
                    spec.chain_id
                );
            }

            let tokens = fetch_token_metadata(spec, &provider).await?;
            tracing::info!(
                chain = spec.name,
                token_count = tokens.len(),
                "connected chain"
            );

            chains.push(Arc::new(ChainContext {
                spec,
                rpc: RpcClient::new(spec, provider),
                tokens,
            }));
        }

        if chains.is_empty() {
            bail!("no chains configured; set at least one RPC url (ETH_RPC, BSC_RPC, AVAX_RPC)");
        }

        Ok(Self::from_contexts(chains))
    }

    /// Assemble a registry from prebuilt contexts. The bridge-config
    /// directory is only reachable when ethereum is among them.
    pub fn from_contexts(chains: Vec<Arc<ChainContext>>) -> Self {
        let bridge_config = chains
            .iter()
            .find(|chain| chain.is_ethereum())
            .map(|chain| BridgeConfigClient::new(chain.rpc.provider().clone()));

        Self {
            chains,
            pools: PoolCache::new(),
            bridge_config,
        }
    }

    pub fn chains(&self) -> &[Arc<ChainContext>] {
        &self.chains
    }

    pub fn chain_by_name(&self, name: &str) -> Option<&Arc<ChainContext>> {
        self.chains.iter().find(|chain| chain.spec.name == name)
    }

    pub fn pools(&self) -> PoolCache {
        self.pools.clone()
    }

    /// Resolve the address a token is known under on another chain, through
    /// the on-chain bridge-config directory.
    pub async fn find_same_token_across_chain(
        &self,
        from_chain_id: u64,
        to_chain_id: u64,
        token: Address,
    ) -> Result<Option<Address>, crate::rpc::RpcError> {
        let Some(config) = &self.bridge_config else {
            return Err(crate::rpc::RpcError::BadResponse(
                "bridge config directory requires a configured ethereum chain".to_string(),
            ));
        };

        let token_id = config.token_id(token, from_chain_id).await?;
        if token_id.is_empty() {
            return Ok(None);
        }

        Ok(config
            .bridge_token(&token_id, to_chain_id)
            .await?
            .map(|info| info.token_address))
    }
}

async fn fetch_token_metadata(
    spec: &'static ChainSpec,
    provider: &DynProvider<Ethereum>,
) -> anyhow::Result<HashMap<Address, TokenMetadata>> {
    let tokens = TOKENS.get(spec.name).cloned().unwrap_or_default();

    stream::iter(tokens)
        .map(|address| {
            let provider = provider.clone();
            async move {
                let contract = ERC20::new(address, provider);
                let name_call = contract.name();
                let symbol_call = contract.symbol();
                let decimals_call = contract.decimals();

                let (name, symbol, decimals) =
                    tokio::try_join!(name_call.call(), symbol_call.call(), decimals_call.call())
                        .with_context(|| {
                            format!("failed to read token metadata for {address} on {}", spec.name)
                        })?;

                Ok::<_, anyhow::Error>((
                    address,
                    TokenMetadata {
                        name,
                        symbol,
                        decimals,
                    },
                ))
            }
        })
        .buffer_unordered(METADATA_FETCH_CONCURRENCY)
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::test_utils::{bsc_spec, encode_address_word, ethereum_spec, mock_chain_context};

    /// ABI-encode a solo `string` return value.
    fn encode_string_word(value: &str) -> String {
        let mut words = vec![format!("{:064x}", 32), format!("{:064x}", value.len())];
        let mut tail = alloy::hex::encode(value.as_bytes());
        while tail.len() % 64 != 0 {
            tail.push('0');
        }
        words.push(tail);
        format!("0x{}", words.concat())
    }

    #[rstest]
    #[case::ethereum("ethereum", 1024)]
    #[case::harmony("harmony", 1024)]
    #[case::moonriver("moonriver", 1024)]
    #[case::moonbeam("moonbeam", 1024)]
    #[case::cronos("cronos", 2000)]
    #[case::boba("boba", 512)]
    #[case::bsc("bsc", 512)]
    #[case::default_chain("arbitrum", 2048)]
    fn get_logs_windows_match_node_limits(#[case] chain: &str, #[case] expected: u64) {
        assert_eq!(get_logs_window(chain), expected);
    }

    #[test]
    fn builtin_chains_are_consistent() {
        for spec in CHAINS.iter() {
            assert_eq!(spec.max_blocks, get_logs_window(spec.name), "{}", spec.name);
        }
        assert_eq!(chain_spec("ethereum").unwrap().chain_id, 1);
        assert_eq!(chain_spec("bsc").unwrap().chain_id, 56);
        assert_eq!(chain_spec("avalanche").unwrap().chain_id, 43114);
        assert!(chain_spec("unknown").is_none());
    }

    #[tokio::test]
    async fn cross_chain_token_resolution_goes_through_the_directory() {
        let (asserter, ethereum) = mock_chain_context(ethereum_spec(), []);
        let registry = ChainRegistry::from_contexts(vec![ethereum]);

        let syn_eth = address!("0f2d719407fdbeff09d87557abb7232601fd9f29");
        let syn_bsc = address!("a4080f1778e69467e905b8d6f72f6e441f9e9484");

        // getTokenID answers the symbol, getToken the record on the other chain.
        asserter.push_success(&encode_string_word("SYN"));
        let mut words = vec!["00".repeat(32); 10];
        words[0] = format!("{:064x}", 56);
        words[1] = encode_address_word(&syn_bsc)
            .trim_start_matches("0x")
            .to_string();
        words[2] = format!("{:064x}", 18);
        asserter.push_success(&format!("0x{}", words.concat()));

        let resolved = registry
            .find_same_token_across_chain(1, 56, syn_eth)
            .await
            .unwrap();
        assert_eq!(resolved, Some(syn_bsc));

        // An empty symbol means the directory does not know the token.
        asserter.push_success(&encode_string_word(""));
        let resolved = registry
            .find_same_token_across_chain(1, 56, syn_eth)
            .await
            .unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn directory_requires_a_configured_ethereum_chain() {
        let (_asserter, bsc) = mock_chain_context(bsc_spec(), []);
        let registry = ChainRegistry::from_contexts(vec![bsc]);

        let err = registry
            .find_same_token_across_chain(56, 1, Address::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::rpc::RpcError::BadResponse(_)));
    }

    #[test]
    fn misrepresented_gmx_wrapper_maps_to_gmx() {
        let wrapper = address!("20a9dc684b4d0407ef8c9a302beaaa18ee15f656");
        let gmx = address!("62edc0692bd897d2295872a9ffcac5425011c661");
        assert_eq!(
            MISREPRESENTED_TOKENS.get(&("avalanche", wrapper)),
            Some(&gmx)
        );
        // The override table is keyed by chain: the same wrapper address on
        // another chain passes through untouched.
        assert_eq!(MISREPRESENTED_TOKENS.get(&("bsc", wrapper)), None);
    }
}
