//! Data Transfer Objects for API requests and responses
//!
//! Amounts cross the boundary as decimal strings so `U256` values survive
//! JSON number limits.

use alloy_primitives::U256;
use amm::{AssetRegistry, HopQuote, Route, RouteResult, TxHandle};
use bastion_core::{Asset, NodeStatus, SwapError};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub network: String,
    pub chain_id: u64,
}

impl HealthResponse {
    pub fn new(network: impl Into<String>, chain_id: u64) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            network: network.into(),
            chain_id,
        }
    }
}

/// Node status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub connected: bool,
    pub url: String,
    pub network: String,
    pub configured_chain_id: u64,
    pub chain_id: Option<u64>,
    pub block_number: Option<u64>,
    pub block_timestamp: Option<u64>,
    pub client_version: Option<String>,
    pub latency_ms: Option<u64>,
}

impl NodeStatusResponse {
    pub fn online(url: String, network: String, configured_chain_id: u64, status: NodeStatus) -> Self {
        Self {
            connected: true,
            url,
            network,
            configured_chain_id,
            chain_id: Some(status.chain_id),
            block_number: Some(status.block_number),
            block_timestamp: Some(status.block_timestamp),
            client_version: status.client_version,
            latency_ms: Some(status.latency_ms),
        }
    }

    pub fn offline(url: String, network: String, configured_chain_id: u64) -> Self {
        Self {
            connected: false,
            url,
            network,
            configured_chain_id,
            chain_id: None,
            block_number: None,
            block_timestamp: None,
            client_version: None,
            latency_ms: None,
        }
    }
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

impl From<&SwapError> for ApiError {
    fn from(err: &SwapError) -> Self {
        Self::new(err.error_code(), err.user_message())
    }
}

/// How request amounts are expressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountUnits {
    /// Integer base units (wei-style)
    #[default]
    Base,
    /// Decimal display units, scaled by the asset's decimals
    Display,
}

/// Asset as listed by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDto {
    /// `"native"` or the token address
    pub id: String,
    pub symbol: String,
    pub decimals: u8,
    pub native: bool,
}

impl From<&Asset> for AssetDto {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id.to_string(),
            symbol: asset.symbol.clone(),
            decimals: asset.decimals,
            native: asset.is_native(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsResponse {
    pub assets: Vec<AssetDto>,
    pub count: usize,
}

/// POST /quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Symbol, `"native"` or token address
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    #[serde(default)]
    pub max_hops: Option<usize>,
    #[serde(default)]
    pub units: AmountUnits,
}

/// POST /quote/exact-out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExactOutRequest {
    pub path: Vec<String>,
    pub amount_out: String,
    #[serde(default)]
    pub units: AmountUnits,
}

/// POST /swap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Asset path of the confirmed route, input first
    pub path: Vec<String>,
    pub amount_in: String,
    /// Minimum output before slippage is applied, usually the quoted output
    pub min_amount_out: String,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub units: AmountUnits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopDto {
    pub pool: String,
    pub token_in: String,
    pub token_out: String,
    pub reserve_in: String,
    pub reserve_out: String,
    pub amount_in: String,
    pub amount_out: String,
    pub price_impact_bps: u64,
}

impl From<&HopQuote> for HopDto {
    fn from(hop: &HopQuote) -> Self {
        Self {
            pool: hop.pool.to_string(),
            token_in: hop.token_in.to_string(),
            token_out: hop.token_out.to_string(),
            reserve_in: hop.reserve_in.to_string(),
            reserve_out: hop.reserve_out.to_string(),
            amount_in: hop.amount_in.to_string(),
            amount_out: hop.amount_out.to_string(),
            price_impact_bps: hop.price_impact_bps,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDto {
    pub path: Vec<AssetDto>,
    pub pairs: Vec<String>,
    /// Base units at each step, input first
    pub amounts: Vec<String>,
    /// `amounts` in display units
    pub amounts_display: Vec<String>,
    pub amount_in: String,
    pub amount_out: String,
    pub hop_count: usize,
    pub price_impact_bps: u64,
    pub price_impact_percent: f64,
    pub effective_rate: f64,
    pub hops: Vec<HopDto>,
}

impl From<&Route> for RouteDto {
    fn from(route: &Route) -> Self {
        Self {
            path: route.path.iter().map(AssetDto::from).collect(),
            pairs: route.pairs.iter().map(|p| p.to_string()).collect(),
            amounts: route.amounts.iter().map(U256::to_string).collect(),
            amounts_display: route
                .path
                .iter()
                .zip(&route.amounts)
                .map(|(asset, amount)| AssetRegistry::format_units(asset, *amount))
                .collect(),
            amount_in: route.amount_in().to_string(),
            amount_out: route.amount_out().to_string(),
            hop_count: route.hop_count(),
            price_impact_bps: route.price_impact_bps,
            price_impact_percent: route.price_impact_percent(),
            effective_rate: route.effective_rate(),
            hops: route.hops.iter().map(HopDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    /// `null` when no candidate path has liquidity
    pub best_route: Option<RouteDto>,
    pub all_routes: Vec<RouteDto>,
    pub route_count: usize,
}

impl From<&RouteResult> for QuoteResponse {
    fn from(result: &RouteResult) -> Self {
        Self {
            best_route: result.best_route.as_ref().map(RouteDto::from),
            all_routes: result.all_routes.iter().map(RouteDto::from).collect(),
            route_count: result.all_routes.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResponse {
    pub tx_hash: String,
    pub approval_tx: Option<String>,
    pub amount_in: String,
    pub min_amount_out: String,
    pub deadline: u64,
    pub block_number: u64,
}

impl From<&TxHandle> for SwapResponse {
    fn from(handle: &TxHandle) -> Self {
        Self {
            tx_hash: handle.tx_hash.to_string(),
            approval_tx: handle.approval_tx.map(|tx| tx.to_string()),
            amount_in: handle.amount_in.to_string(),
            min_amount_out: handle.min_amount_out.to_string(),
            deadline: handle.deadline,
            block_number: handle.block_number,
        }
    }
}
