//! Node status

use std::time::Instant;

use bastion_core::{NodeError, NodeStatus};
use serde::Deserialize;
use serde_json::json;

use crate::rpc::{parse_quantity, RpcTransport};

#[derive(Debug, Deserialize)]
pub(crate) struct LatestBlock {
    pub number: String,
    pub timestamp: String,
}

/// Chain id, head block and client version of the node behind `rpc`.
///
/// The client version is optional; some providers do not expose
/// `web3_clientVersion`.
pub async fn node_status(rpc: &RpcTransport) -> Result<NodeStatus, NodeError> {
    let start = Instant::now();

    let chain_id: String = rpc.request("eth_chainId", json!([])).await?;
    let block: LatestBlock = rpc
        .request("eth_getBlockByNumber", json!(["latest", false]))
        .await?;
    let latency_ms = start.elapsed().as_millis() as u64;

    let client_version = match rpc.request::<String>("web3_clientVersion", json!([])).await {
        Ok(version) => Some(version),
        Err(e) => {
            tracing::debug!("web3_clientVersion unavailable at {}: {}", rpc.url(), e);
            None
        }
    };

    Ok(NodeStatus {
        chain_id: parse_quantity(&chain_id)?,
        block_number: parse_quantity(&block.number)?,
        block_timestamp: parse_quantity(&block.timestamp)?,
        client_version,
        latency_ms,
    })
}
