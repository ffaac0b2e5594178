//! AMM State Types
//!
//! Data structures for pool reserves, quoted routes and submitted swaps.

use alloy_primitives::{Address, U256};
use bastion_core::{Asset, NodeError, PoolId, SwapError, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::calculator;
use crate::constants::precision::BPS_PER_PERCENT;

/// Reserves of one pair, tagged with the pair's own token ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReserves {
    pub pool: PoolId,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
}

impl PoolReserves {
    /// `(reserve_in, reserve_out)` for a swap selling `token_in`.
    ///
    /// Storage order and request order are unrelated; this is the only place
    /// the mapping is made.
    pub fn oriented(&self, token_in: Address) -> Result<(U256, U256), AmmError> {
        if token_in == self.token0 {
            Ok((self.reserve0, self.reserve1))
        } else if token_in == self.token1 {
            Ok((self.reserve1, self.reserve0))
        } else {
            Err(AmmError::InvalidPath(format!(
                "{} is not a member of pool {}",
                token_in, self.pool
            )))
        }
    }

    pub fn contains(&self, token: Address) -> bool {
        token == self.token0 || token == self.token1
    }
}

impl fmt::Display for PoolReserves {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pool {} | {}: {} | {}: {}",
            self.pool, self.token0, self.reserve0, self.token1, self.reserve1
        )
    }
}

/// One evaluated hop of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopQuote {
    pub pool: PoolId,
    pub token_in: Address,
    pub token_out: Address,
    pub reserve_in: U256,
    pub reserve_out: U256,
    pub amount_in: U256,
    pub amount_out: U256,
    /// Price impact of this hop alone, in basis points
    pub price_impact_bps: u64,
}

/// A quoted path from input asset to output asset.
///
/// `pairs.len() == path.len() - 1` and `amounts.len() == path.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub path: Vec<Asset>,
    pub pairs: Vec<PoolId>,
    pub amounts: Vec<U256>,
    pub hops: Vec<HopQuote>,
    /// Sum of the per-hop impacts (additive, not compounded), in basis points
    pub price_impact_bps: u64,
}

impl Route {
    /// Build a route from evaluated hops.
    ///
    /// `amounts` is taken from the hops: the first hop's input followed by
    /// every hop's output.
    pub fn from_hops(path: Vec<Asset>, hops: Vec<HopQuote>) -> Result<Self, AmmError> {
        if path.len() < 2 || hops.len() != path.len() - 1 {
            return Err(AmmError::InvalidPath(format!(
                "{} assets cannot be joined by {} hops",
                path.len(),
                hops.len()
            )));
        }
        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(hops[0].amount_in);
        amounts.extend(hops.iter().map(|h| h.amount_out));

        let price_impact_bps = hops.iter().map(|h| h.price_impact_bps).sum();
        let pairs = hops.iter().map(|h| h.pool).collect();

        Ok(Self {
            path,
            pairs,
            amounts,
            hops,
            price_impact_bps,
        })
    }

    pub fn amount_in(&self) -> U256 {
        self.amounts.first().copied().unwrap_or_default()
    }

    pub fn amount_out(&self) -> U256 {
        self.amounts.last().copied().unwrap_or_default()
    }

    pub fn hop_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn token_in(&self) -> Option<&Asset> {
        self.path.first()
    }

    pub fn token_out(&self) -> Option<&Asset> {
        self.path.last()
    }

    /// Aggregate impact as a percentage (two decimal digits of precision)
    pub fn price_impact_percent(&self) -> f64 {
        self.price_impact_bps as f64 / BPS_PER_PERCENT
    }

    /// Output per unit of input, in base units
    pub fn effective_rate(&self) -> f64 {
        calculator::effective_rate(self.amount_in(), self.amount_out())
    }

    /// Minimum acceptable output for the given slippage tolerance
    pub fn min_output(&self, slippage_bps: u32) -> Result<U256, AmmError> {
        calculator::apply_slippage(self.amount_out(), slippage_bps)
    }

    /// Normalized token addresses the router contract walks through
    pub fn token_path(&self) -> Vec<Address> {
        let mut tokens = Vec::with_capacity(self.hops.len() + 1);
        if let Some(first) = self.hops.first() {
            tokens.push(first.token_in);
        }
        tokens.extend(self.hops.iter().map(|h| h.token_out));
        tokens
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<&str> = self.path.iter().map(|a| a.symbol.as_str()).collect();
        write!(
            f,
            "{} | in: {} | out: {} | impact: {:.2}%",
            symbols.join(" -> "),
            self.amount_in(),
            self.amount_out(),
            self.price_impact_percent()
        )
    }
}

/// Outcome of a route search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Candidate with the greatest output, `None` when nothing is routable
    pub best_route: Option<Route>,
    /// Every candidate that evaluated successfully, in enumeration order
    pub all_routes: Vec<Route>,
}

impl RouteResult {
    pub fn is_empty(&self) -> bool {
        self.best_route.is_none()
    }
}

/// A swap that was submitted and mined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
    pub tx_hash: TxHash,
    /// Approval mined ahead of the swap, if the allowance was short
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_tx: Option<TxHash>,
    pub amount_in: U256,
    pub min_amount_out: U256,
    /// Absolute deadline, in chain time
    pub deadline: u64,
    pub block_number: u64,
}

/// AMM protocol errors
#[derive(Debug, Clone, Error)]
pub enum AmmError {
    #[error("No pool for {token_a} / {token_b}")]
    NoPool { token_a: Address, token_b: Address },

    #[error("Pool {pool} has no liquidity")]
    NoLiquidity { pool: PoolId },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Insufficient input amount")]
    InsufficientInput,

    #[error("Insufficient liquidity for swap")]
    InsufficientLiquidity,

    #[error("Slippage of {0} bps exceeds 100%")]
    InvalidSlippage(u32),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Node error: {0}")]
    Node(#[from] NodeError),
}

impl AmmError {
    /// Whether this failure only rules out one candidate path
    pub fn prunes_candidate(&self) -> bool {
        matches!(
            self,
            Self::NoPool { .. }
                | Self::NoLiquidity { .. }
                | Self::InsufficientInput
                | Self::InsufficientLiquidity
                | Self::Overflow
        )
    }
}

impl From<AmmError> for SwapError {
    fn from(err: AmmError) -> Self {
        match err {
            AmmError::NoPool { token_a, token_b } => SwapError::NoPool { token_a, token_b },
            AmmError::NoLiquidity { pool } => SwapError::NoLiquidity { pool },
            AmmError::InvalidPath(reason) => SwapError::InvalidPath { reason },
            AmmError::InsufficientInput => SwapError::InsufficientInput,
            AmmError::InsufficientLiquidity => SwapError::InsufficientLiquidity,
            AmmError::InvalidSlippage(bps) => SwapError::InvalidSlippage { bps },
            AmmError::Overflow => SwapError::InvalidAmount {
                reason: "amount too large".to_string(),
            },
            AmmError::Node(e) => SwapError::from(e),
        }
    }
}
