//! evm-node-client: JSON-RPC client for EVM nodes
//!
//! Implements the engine's chain interfaces over plain JSON-RPC. Transactions
//! are sent with `eth_sendTransaction` from the configured account, so signing
//! stays with the node or the external signer behind it.

pub mod abi;
pub mod rpc;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use bastion_core::{
    ChainConfig, ChainRead, ChainWrite, NodeConfig, NodeError, NodeHealth, NodeStatus, PoolId,
    ReserveSnapshot, SwapCall, TxHash, TxReceipt,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::abi::{IUniswapV2Factory, IUniswapV2Pair, IERC20};
use crate::rpc::{parse_data, parse_quantity, parse_u256, to_data, to_quantity, RpcTransport};
use crate::status::LatestBlock;

/// Result type for node client operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// EVM node client bound to one factory deployment
#[derive(Clone)]
pub struct NodeClient {
    rpc: Arc<RpcTransport>,
    config: NodeConfig,
    factory: Address,
}

impl NodeClient {
    /// Create a client and check that the node serves the configured chain
    pub async fn connect(config: NodeConfig, chain: &ChainConfig) -> Result<Self> {
        let client = Self::new(config, chain.factory);
        let chain_id = client.chain_id().await?;
        if chain_id != chain.chain_id {
            tracing::warn!(
                "Node at {} reports chain id {}, configured {}",
                client.config.url,
                chain_id,
                chain.chain_id
            );
        }
        tracing::info!("Connected to {} (chain id {})", client.config.url, chain_id);
        Ok(client)
    }

    /// Create without contacting the node
    pub fn new(config: NodeConfig, factory: Address) -> Self {
        let rpc = RpcTransport::new(
            config.url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        );
        Self {
            rpc: Arc::new(rpc),
            config,
            factory,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let raw: String = self.rpc.request("eth_chainId", json!([])).await?;
        parse_quantity(&raw)
    }

    pub async fn block_number(&self) -> Result<u64> {
        let raw: String = self.rpc.request("eth_blockNumber", json!([])).await?;
        parse_quantity(&raw)
    }

    /// Read-only contract call against the latest block.
    ///
    /// `None` when `to` has no code (the node returns empty data).
    async fn eth_call<C: SolCall>(&self, to: Address, call: &C) -> Result<Option<C::Return>> {
        let raw: String = self
            .rpc
            .request(
                "eth_call",
                json!([{ "to": to, "data": to_data(&call.abi_encode()) }, "latest"]),
            )
            .await?;
        let bytes = parse_data(&raw)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        C::abi_decode_returns(&bytes, true)
            .map(Some)
            .map_err(|e| NodeError::ParseError(format!("{} from {}: {}", C::SIGNATURE, to, e)))
    }

    async fn send_transaction(&self, to: Address, data: Vec<u8>, value: U256) -> Result<TxHash> {
        let from = self.sender()?;
        let hash: B256 = self
            .rpc
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": from,
                    "to": to,
                    "data": to_data(&data),
                    "value": to_quantity(value),
                }]),
            )
            .await?;
        Ok(TxHash::new(hash))
    }

    /// Replay a failed transaction at its block to recover the revert message
    async fn revert_reason(&self, tx_hash: TxHash, block_number: u64) -> Option<String> {
        let tx: Option<Value> = self
            .rpc
            .request("eth_getTransactionByHash", json!([tx_hash.0]))
            .await
            .ok()?;
        let tx = tx?;
        let replay = json!([{
            "from": tx.get("from")?,
            "to": tx.get("to")?,
            "data": tx.get("input")?,
            "value": tx.get("value")?,
        }, format!("{:#x}", block_number)]);

        match self.rpc.request::<String>("eth_call", replay).await {
            Err(NodeError::Rpc { message, .. }) => Some(message),
            Err(e) => {
                tracing::debug!("Could not replay {}: {}", tx_hash, e);
                None
            }
            // State moved on since; the replay no longer reverts
            Ok(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    block_number: Option<String>,
    status: Option<String>,
}

/// `(block_number, success)` of a mined receipt; `None` while pending
fn parse_receipt(raw: Option<RawReceipt>) -> Result<Option<(u64, bool)>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let Some(block) = raw.block_number else {
        return Ok(None);
    };
    let block_number = parse_quantity(&block)?;
    // Pre-Byzantium receipts have no status; treat as success
    let success = match raw.status.as_deref() {
        Some(status) => parse_quantity(status)? == 1,
        None => true,
    };
    Ok(Some((block_number, success)))
}

#[async_trait]
impl ChainRead for NodeClient {
    async fn get_pool(&self, token_a: Address, token_b: Address) -> Result<Option<PoolId>> {
        let call = IUniswapV2Factory::getPairCall {
            tokenA: token_a,
            tokenB: token_b,
        };
        let pair = self.eth_call(self.factory, &call).await?;
        Ok(pair
            .map(|ret| ret.pair)
            .filter(|pair| *pair != Address::ZERO)
            .map(PoolId::new))
    }

    async fn get_reserves(&self, pool: PoolId) -> Result<Option<ReserveSnapshot>> {
        let address = pool.address();
        let (token0, token1, reserves) = tokio::try_join!(
            self.eth_call(address, &IUniswapV2Pair::token0Call {}),
            self.eth_call(address, &IUniswapV2Pair::token1Call {}),
            self.eth_call(address, &IUniswapV2Pair::getReservesCall {}),
        )?;
        let (Some(token0), Some(token1), Some(reserves)) = (token0, token1, reserves) else {
            tracing::debug!("{} is not a pair contract", pool);
            return Ok(None);
        };
        Ok(Some(ReserveSnapshot {
            token0: token0.token,
            token1: token1.token,
            reserve0: U256::from(reserves.reserve0),
            reserve1: U256::from(reserves.reserve1),
        }))
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        self.eth_call(token, &IERC20::decimalsCall {})
            .await?
            .map(|ret| ret.value)
            .ok_or_else(|| NodeError::ParseError(format!("no contract at {}", token)))
    }

    async fn block_timestamp(&self) -> Result<u64> {
        let block: LatestBlock = self
            .rpc
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        tracing::trace!("latest block {}", block.number);
        parse_quantity(&block.timestamp)
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        let raw: String = self
            .rpc
            .request("eth_getBalance", json!([owner, "latest"]))
            .await?;
        parse_u256(&raw)
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let ret = self.eth_call(token, &IERC20::balanceOfCall { owner }).await?;
        ret.map(|r| r.balance)
            .ok_or_else(|| NodeError::ParseError(format!("no contract at {}", token)))
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let ret = self
            .eth_call(token, &IERC20::allowanceCall { owner, spender })
            .await?;
        ret.map(|r| r.remaining)
            .ok_or_else(|| NodeError::ParseError(format!("no contract at {}", token)))
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        let raw: Option<RawReceipt> = self
            .rpc
            .request("eth_getTransactionReceipt", json!([tx_hash.0]))
            .await?;
        let Some((block_number, success)) = parse_receipt(raw)? else {
            return Ok(None);
        };
        let revert_reason = if success {
            None
        } else {
            self.revert_reason(tx_hash, block_number).await
        };
        Ok(Some(TxReceipt {
            tx_hash,
            block_number,
            success,
            revert_reason,
        }))
    }
}

#[async_trait]
impl ChainWrite for NodeClient {
    fn sender(&self) -> Result<Address> {
        self.config.sender.ok_or(NodeError::NoSender)
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxHash> {
        let tx_hash = self
            .send_transaction(token, abi::encode_approve(spender, amount), U256::ZERO)
            .await?;
        tracing::debug!("approve({}, {}) on {} sent as {}", spender, amount, token, tx_hash);
        Ok(tx_hash)
    }

    async fn swap(&self, call: &SwapCall) -> Result<TxHash> {
        let tx_hash = self
            .send_transaction(call.router, abi::encode_swap(call), call.value())
            .await?;
        tracing::debug!("{:?} sent as {}", call.kind, tx_hash);
        Ok(tx_hash)
    }
}

#[async_trait]
impl NodeHealth for NodeClient {
    async fn status(&self) -> Result<NodeStatus> {
        status::node_status(&self.rpc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(value: Value) -> Option<RawReceipt> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.url, "http://127.0.0.1:8545");
    }

    #[test]
    fn test_pending_receipt() {
        assert_eq!(parse_receipt(receipt(Value::Null)).unwrap(), None);
        let no_block = receipt(json!({"blockNumber": null, "status": null}));
        assert_eq!(parse_receipt(no_block).unwrap(), None);
    }

    #[test]
    fn test_mined_receipts() {
        let ok = receipt(json!({"blockNumber": "0x10", "status": "0x1", "gasUsed": "0x5208"}));
        assert_eq!(parse_receipt(ok).unwrap(), Some((16, true)));

        let failed = receipt(json!({"blockNumber": "0x11", "status": "0x0"}));
        assert_eq!(parse_receipt(failed).unwrap(), Some((17, false)));

        let legacy = receipt(json!({"blockNumber": "0x1"}));
        assert_eq!(parse_receipt(legacy).unwrap(), Some((1, true)));
    }

    #[test]
    fn test_sender_required_for_writes() {
        let client = NodeClient::new(NodeConfig::default(), Address::ZERO);
        assert!(matches!(client.sender(), Err(NodeError::NoSender)));

        let config = NodeConfig {
            sender: Some(Address::repeat_byte(7)),
            ..NodeConfig::default()
        };
        let client = NodeClient::new(config, Address::ZERO);
        assert_eq!(client.sender().unwrap(), Address::repeat_byte(7));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let config = NodeConfig {
            // Reserved port; nothing listens
            url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            sender: None,
        };
        let client = NodeClient::new(config, Address::ZERO);
        let err = client.block_number().await.unwrap_err();
        assert!(err.is_transient());
    }
}
