//! Constant-product AMM engine
//!
//! Routing, integer-exact quoting and protected swap execution against
//! Uniswap-V2 style pairs. Chain access goes through the `ChainRead` and
//! `ChainWrite` collaborators from `bastion-core`.

pub mod assets;
pub mod calculator;
pub mod constants;
pub mod executor;
pub mod locator;
pub mod normalizer;
pub mod reserves;
pub mod router;
pub mod service;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use assets::AssetRegistry;
pub use calculator::{
    apply_slippage, get_amount_in, get_amount_out, get_amounts_in, get_amounts_out,
    optimal_liquidity_amounts, price_impact_bps, quote,
};
pub use constants::{fees, precision};
pub use executor::{swap_kind, ExecutorSettings, SwapExecutor};
pub use locator::{pair_address, sort_tokens, PoolLocator};
pub use normalizer::AssetNormalizer;
pub use reserves::ReserveReader;
pub use router::{candidate_paths, clamp_hops, select_best, Router};
pub use service::DexService;
pub use state::{AmmError, HopQuote, PoolReserves, Route, RouteResult, TxHandle};
