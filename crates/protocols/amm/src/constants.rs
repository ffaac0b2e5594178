//! AMM Constants
//!
//! Fee parameters of the Uniswap-V2 pair family (single 0.3% tier).

/// Fee constants
pub mod fees {
    /// Fee numerator applied to the input amount (0.3% fee = 997/1000)
    pub const FEE_NUM: u64 = 997;

    /// Fee denominator
    pub const FEE_DENOM: u64 = 1000;
}

/// Price-impact and slippage precision
pub mod precision {
    /// 100% expressed in basis points
    pub const BPS: u64 = 10_000;

    /// Basis points per whole percent
    pub const BPS_PER_PERCENT: f64 = 100.0;
}
