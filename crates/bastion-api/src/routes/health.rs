//! Liveness endpoint

use axum::{extract::State, Json};

use crate::dto::HealthResponse;
use crate::AppState;

/// GET /health - Process is up; says nothing about the node
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let chain = &state.config().chain;
    Json(HealthResponse::new(chain.network.as_str(), chain.chain_id))
}
