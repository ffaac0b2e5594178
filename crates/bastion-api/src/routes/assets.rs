//! Known asset listing

use axum::{extract::State, Json};

use crate::dto::{AssetDto, AssetsResponse};
use crate::AppState;

/// GET /assets - Native asset first, then configured tokens
pub async fn list_assets(State(state): State<AppState>) -> Json<AssetsResponse> {
    let assets: Vec<AssetDto> = state
        .service()
        .registry()
        .all()
        .iter()
        .map(AssetDto::from)
        .collect();
    let count = assets.len();
    Json(AssetsResponse { assets, count })
}
