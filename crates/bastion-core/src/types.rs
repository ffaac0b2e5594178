//! Core type definitions for Bastion

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Identity of a fungible asset.
///
/// The chain's base currency has no contract address; everything else is an
/// ERC-20 token. The distinction is decided once, here, and every later
/// branch (approval vs. value transfer, router entry point) matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AssetId {
    Native,
    Erc20(Address),
}

impl AssetId {
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Contract address, if this is a token
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::Native => None,
            Self::Erc20(addr) => Some(*addr),
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Erc20(addr) => write!(f, "{}", addr),
        }
    }
}

impl FromStr for AssetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("native") {
            return Ok(Self::Native);
        }
        trimmed
            .parse::<Address>()
            .map(Self::Erc20)
            .map_err(|e| format!("invalid asset id '{}': {}", trimmed, e))
    }
}

impl TryFrom<String> for AssetId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssetId> for String {
    fn from(value: AssetId) -> Self {
        value.to_string()
    }
}

/// A known asset: identity plus display metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub symbol: String,
    pub decimals: u8,
}

impl Asset {
    pub fn new(id: AssetId, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            decimals,
        }
    }

    pub fn native(symbol: impl Into<String>, decimals: u8) -> Self {
        Self::new(AssetId::Native, symbol, decimals)
    }

    pub fn erc20(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self::new(AssetId::Erc20(address), symbol, decimals)
    }

    pub fn is_native(&self) -> bool {
        self.id.is_native()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Pool (pair contract) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub Address);

impl PoolId {
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub B256);

impl TxHash {
    pub fn new(hash: B256) -> Self {
        Self(hash)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time reserves of a pair, in the pair's own storage order.
///
/// `token0 < token1` always holds for pairs created by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveSnapshot {
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
}

/// Mined transaction outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub success: bool,
    /// Decoded revert message when `success` is false and the node could replay it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
}

/// Snapshot of the connected node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub chain_id: u64,
    pub block_number: u64,
    pub block_timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
    /// Round trip of the status check, in milliseconds
    pub latency_ms: u64,
}

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Constants
pub mod constants {
    /// Basis-point denominator (100% = 10_000 bps)
    pub const BPS_DENOMINATOR: u64 = 10_000;

    /// Maximum number of hops the router will search
    pub const MAX_HOPS: usize = 3;

    /// Default slippage tolerance (0.5%)
    pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

    /// Default swap deadline, relative to chain time (20 minutes)
    pub const DEFAULT_DEADLINE_SECS: u64 = 20 * 60;

    /// Decimals of the EVM base currency
    pub const NATIVE_DECIMALS: u8 = 18;
}
