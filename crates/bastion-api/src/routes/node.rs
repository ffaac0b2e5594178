//! Node status endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::dto::NodeStatusResponse;
use crate::routes::ApiResult;
use crate::AppState;

/// Create node routes
pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

/// GET /node/status - Status of the configured node
pub async fn get_status(State(state): State<AppState>) -> ApiResult<NodeStatusResponse> {
    let config = state.config();
    let url = config.node.url.clone();
    let network = config.chain.network.as_str().to_string();
    let chain_id = config.chain.chain_id;

    match state.health().status().await {
        Ok(status) => {
            if status.chain_id != chain_id {
                tracing::warn!(
                    "Node reports chain id {}, configured {}",
                    status.chain_id,
                    chain_id
                );
            }
            Ok(Json(NodeStatusResponse::online(url, network, chain_id, status)))
        }
        Err(e) => {
            tracing::warn!("Node status check failed for {}: {}", url, e);
            Ok(Json(NodeStatusResponse::offline(url, network, chain_id)))
        }
    }
}
