//! Chain collaborator interfaces
//!
//! The engine never talks to a node directly. Reads and writes go through
//! these traits so the JSON-RPC client and in-memory test chains are
//! interchangeable.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::NodeError;
use crate::types::{NodeStatus, PoolId, ReserveSnapshot, TxHash, TxReceipt};

/// Read-only, side-effect-free chain queries.
///
/// Every value is a point-in-time snapshot and may be stale by the time it
/// is used.
#[async_trait]
pub trait ChainRead: Send + Sync {
    /// Pair address for two tokens, or `None` if the factory never created one
    async fn get_pool(&self, token_a: Address, token_b: Address)
        -> Result<Option<PoolId>, NodeError>;

    /// Current reserves of a pair, or `None` if `pool` is not a pair contract
    async fn get_reserves(&self, pool: PoolId) -> Result<Option<ReserveSnapshot>, NodeError>;

    async fn decimals(&self, token: Address) -> Result<u8, NodeError>;

    /// Timestamp of the latest block (the chain's own clock)
    async fn block_timestamp(&self) -> Result<u64, NodeError>;

    async fn native_balance(&self, owner: Address) -> Result<U256, NodeError>;

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, NodeError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, NodeError>;

    /// Receipt of a mined transaction, `None` while pending
    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, NodeError>;
}

/// Router entry point for a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapKind {
    /// `swapExactTokensForTokens`
    ExactTokensForTokens,
    /// `swapExactETHForTokens`, input paid as call value
    ExactNativeForTokens,
    /// `swapExactTokensForETH`, output unwrapped to the recipient
    ExactTokensForNative,
}

impl SwapKind {
    pub fn pays_value(&self) -> bool {
        matches!(self, Self::ExactNativeForTokens)
    }
}

/// A fully-specified router swap call.
///
/// `path` holds wrapped token addresses only; the router re-derives each
/// hop's pair from consecutive elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCall {
    pub router: Address,
    pub kind: SwapKind,
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub recipient: Address,
    pub deadline: u64,
}

impl SwapCall {
    /// Call value to attach (the input amount for native-input swaps)
    pub fn value(&self) -> U256 {
        if self.kind.pays_value() {
            self.amount_in
        } else {
            U256::ZERO
        }
    }
}

/// State-changing calls, signed by an external wallet/account.
#[async_trait]
pub trait ChainWrite: Send + Sync {
    /// Account that signs and pays for transactions
    fn sender(&self) -> Result<Address, NodeError>;

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, NodeError>;

    async fn swap(&self, call: &SwapCall) -> Result<TxHash, NodeError>;
}

/// Health check for the node behind the chain interfaces
#[async_trait]
pub trait NodeHealth: Send + Sync {
    async fn status(&self) -> Result<NodeStatus, NodeError>;
}
