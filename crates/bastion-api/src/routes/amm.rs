//! Quote and swap routes

use alloy_primitives::{Address, U256};
use amm::{AssetRegistry, DexService};
use axum::{extract::State, routing::post, Json, Router};
use bastion_core::{AssetId, SwapError};

use crate::dto::{
    AmountUnits, ExactOutRequest, QuoteRequest, QuoteResponse, RouteDto, SwapRequest,
    SwapResponse,
};
use crate::routes::{bad_request, swap_error, ApiResult};
use crate::AppState;

/// Create quote and swap routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quote", post(get_quote))
        .route("/quote/exact-out", post(get_exact_out_quote))
        .route("/swap", post(confirm_swap))
}

/// POST /quote - Best route for an exact input
async fn get_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<QuoteResponse> {
    let service = state.service();
    let registry = service.registry();
    let token_in = registry.parse_id(&request.token_in).map_err(swap_error)?;
    let token_out = registry.parse_id(&request.token_out).map_err(swap_error)?;
    let amount_in = parse_amount(service, &token_in, &request.amount_in, request.units)
        .await
        .map_err(swap_error)?;

    let result = service
        .request_quote(&token_in, &token_out, amount_in, request.max_hops)
        .await
        .map_err(swap_error)?;

    Ok(Json(QuoteResponse::from(&result)))
}

/// POST /quote/exact-out - Input needed for an exact output over a path
async fn get_exact_out_quote(
    State(state): State<AppState>,
    Json(request): Json<ExactOutRequest>,
) -> ApiResult<RouteDto> {
    let service = state.service();
    let path = parse_path(service, &request.path).map_err(swap_error)?;
    let Some(last) = path.last() else {
        return Err(bad_request("path is empty"));
    };
    let amount_out = parse_amount(service, last, &request.amount_out, request.units)
        .await
        .map_err(swap_error)?;

    let route = service
        .quote_exact_out(&path, amount_out)
        .await
        .map_err(swap_error)?;

    Ok(Json(RouteDto::from(&route)))
}

/// POST /swap - Execute a confirmed route
async fn confirm_swap(
    State(state): State<AppState>,
    Json(request): Json<SwapRequest>,
) -> ApiResult<SwapResponse> {
    let service = state.service();
    let path = parse_path(service, &request.path).map_err(swap_error)?;
    let (Some(first), Some(last)) = (path.first(), path.last()) else {
        return Err(bad_request("path is empty"));
    };
    let amount_in = parse_amount(service, first, &request.amount_in, request.units)
        .await
        .map_err(swap_error)?;
    let min_amount_out = parse_amount(service, last, &request.min_amount_out, request.units)
        .await
        .map_err(swap_error)?;
    let recipient = match request.recipient.as_deref() {
        Some(raw) => Some(
            raw.trim()
                .parse::<Address>()
                .map_err(|e| bad_request(format!("invalid recipient '{}': {}", raw, e)))?,
        ),
        None => None,
    };

    tracing::info!("Confirming swap of {} over {} assets", amount_in, path.len());

    let handle = service
        .confirm_path(
            &path,
            amount_in,
            min_amount_out,
            request.slippage_bps,
            recipient,
        )
        .await
        .map_err(swap_error)?;

    Ok(Json(SwapResponse::from(&handle)))
}

fn parse_path(service: &DexService, raw: &[String]) -> Result<Vec<AssetId>, SwapError> {
    raw.iter()
        .map(|entry| service.registry().parse_id(entry))
        .collect()
}

/// Amount in base units for `asset`
async fn parse_amount(
    service: &DexService,
    asset: &AssetId,
    raw: &str,
    units: AmountUnits,
) -> Result<U256, SwapError> {
    match units {
        AmountUnits::Base => raw.trim().parse::<U256>().map_err(|e| SwapError::InvalidAmount {
            reason: format!("'{}': {}", raw, e),
        }),
        AmountUnits::Display => {
            let asset = service.registry().resolve(asset, false).await?;
            AssetRegistry::to_base_units(&asset, raw)
        }
    }
}
