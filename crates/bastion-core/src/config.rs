//! Configuration types for Bastion

use std::path::Path;

use alloy_primitives::{address, b256, Address, B256};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::retry::RetryPolicy;
use crate::types::constants::{
    DEFAULT_DEADLINE_SECS, DEFAULT_SLIPPAGE_BPS, MAX_HOPS, NATIVE_DECIMALS,
};
use crate::types::{Asset, Network};

/// Node connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// JSON-RPC URL (e.g., "http://127.0.0.1:8545")
    pub url: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Account the node signs with (unlocked account or external signer)
    #[serde(default)]
    pub sender: Option<Address>,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
            sender: None,
        }
    }
}

/// How pool identifiers are resolved from a token pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PoolSource {
    /// Ask the factory (`getPair`)
    Factory,
    /// Derive the pair address offline from the factory's CREATE2 parameters
    Create2 { init_code_hash: B256 },
}

/// Deployed AMM contracts and base-currency metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub network: Network,
    pub router: Address,
    pub factory: Address,
    /// Wrapped representation of the base currency
    pub wrapped_native: Address,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    #[serde(default = "default_pool_source")]
    pub pool_source: PoolSource,
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

fn default_native_decimals() -> u8 {
    NATIVE_DECIMALS
}

fn default_pool_source() -> PoolSource {
    PoolSource::Factory
}

/// Uniswap V2 pair init code hash (mainnet factory)
pub const UNISWAP_V2_INIT_CODE_HASH: B256 =
    b256!("96e8ac4277198ff8b6f785478aa9a39f403cb768dd02cbee326c3e7da348845f");

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            network: Network::Mainnet,
            router: address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
            factory: address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f"),
            wrapped_native: address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            native_symbol: default_native_symbol(),
            native_decimals: default_native_decimals(),
            pool_source: default_pool_source(),
        }
    }
}

/// Known ERC-20 asset entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl From<&AssetConfig> for Asset {
    fn from(cfg: &AssetConfig) -> Self {
        Asset::erc20(cfg.address, cfg.symbol.clone(), cfg.decimals)
    }
}

/// Path search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Default hop bound for quotes (1..=3)
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
}

fn default_max_hops() -> usize {
    MAX_HOPS
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
        }
    }
}

/// Swap submission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapConfig {
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u32,
    /// Deadline relative to the latest block timestamp
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    /// Interval between receipt polls
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    /// Give up waiting for a receipt after this long
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
}

fn default_slippage_bps() -> u32 {
    DEFAULT_SLIPPAGE_BPS
}

fn default_deadline_secs() -> u64 {
    DEFAULT_DEADLINE_SECS
}

fn default_receipt_poll_ms() -> u64 {
    2_000
}

fn default_receipt_timeout_secs() -> u64 {
    30 * 60
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            default_slippage_bps: default_slippage_bps(),
            deadline_secs: default_deadline_secs(),
            receipt_poll_ms: default_receipt_poll_ms(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
        }
    }
}

/// Snapshot cache lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Reserve snapshots; 0 disables caching
    #[serde(default)]
    pub reserves_ttl_ms: u64,
    #[serde(default = "default_decimals_ttl_secs")]
    pub decimals_ttl_secs: u64,
}

fn default_decimals_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reserves_ttl_ms: 0,
            decimals_ttl_secs: default_decimals_ttl_secs(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Node connection settings
    pub node: NodeConfig,

    /// Deployed contracts
    pub chain: ChainConfig,

    /// Known ERC-20 assets, loaded once at startup
    #[serde(default)]
    pub assets: Vec<AssetConfig>,

    /// Intermediate assets tried for multi-hop routes, in priority order
    #[serde(default)]
    pub hubs: Vec<Address>,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub swap: SwapConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub cache: CacheConfig,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_api_port() -> u16 {
    18545
}

impl Default for AppConfig {
    fn default() -> Self {
        let chain = ChainConfig::default();
        let assets = vec![
            AssetConfig {
                address: chain.wrapped_native,
                symbol: "WETH".to_string(),
                decimals: 18,
            },
            AssetConfig {
                address: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
                symbol: "USDC".to_string(),
                decimals: 6,
            },
            AssetConfig {
                address: address!("dAC17F958D2ee523a2206206994597C13D831ec7"),
                symbol: "USDT".to_string(),
                decimals: 6,
            },
            AssetConfig {
                address: address!("6B175474E89094C44Da98b954EedeAC495271d0F"),
                symbol: "DAI".to_string(),
                decimals: 18,
            },
        ];
        let hubs = assets.iter().map(|a| a.address).collect();
        Self {
            node: NodeConfig::default(),
            chain,
            assets,
            hubs,
            routing: RoutingConfig::default(),
            swap: SwapConfig::default(),
            retry: RetryPolicy::default(),
            cache: CacheConfig::default(),
            api_port: default_api_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.routing.max_hops == 0 || self.routing.max_hops > MAX_HOPS {
            return Err(Error::Config(format!(
                "routing.max_hops must be between 1 and {}",
                MAX_HOPS
            )));
        }
        if self.swap.default_slippage_bps > 10_000 {
            return Err(Error::Config(
                "swap.default_slippage_bps must not exceed 10000".to_string(),
            ));
        }
        if self.chain.wrapped_native == Address::ZERO {
            return Err(Error::Config("chain.wrapped_native is not set".to_string()));
        }
        if self.hubs.iter().any(|h| *h == Address::ZERO) {
            return Err(Error::Config("hub list contains the zero address".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The native asset as configured for this chain
    pub fn native_asset(&self) -> Asset {
        Asset::native(self.chain.native_symbol.clone(), self.chain.native_decimals)
    }
}
