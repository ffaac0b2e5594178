//! API route handlers

pub mod amm;
pub mod assets;
pub mod health;
pub mod node;

use axum::{http::StatusCode, routing::get, Json, Router};
use bastion_core::SwapError;

use crate::dto::ApiError;
use crate::AppState;

/// Handler result carrying an error body and status
pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/assets", get(assets::list_assets))
        .nest("/node", node::router())
        .merge(amm::router())
        .with_state(state)
}

/// Map an engine error to its HTTP status and body
pub fn swap_error(err: SwapError) -> (StatusCode, Json<ApiError>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::warn!("Request failed: {}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }
    (status, Json(ApiError::from(&err)))
}

pub fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError::bad_request(message)))
}
