//! AMM Calculator
//!
//! Swap math using the constant product formula (x * y = k), reproducing the
//! on-chain library's integer truncation exactly. No floating point is used
//! for amounts.

use alloy_primitives::U256;

use crate::constants::fees::{FEE_DENOM, FEE_NUM};
use crate::constants::precision::BPS;
use crate::state::AmmError;

fn mul(a: U256, b: U256) -> Result<U256, AmmError> {
    a.checked_mul(b).ok_or(AmmError::Overflow)
}

fn add(a: U256, b: U256) -> Result<U256, AmmError> {
    a.checked_add(b).ok_or(AmmError::Overflow)
}

fn check_reserves(reserve_in: U256, reserve_out: U256) -> Result<(), AmmError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(AmmError::InsufficientLiquidity);
    }
    Ok(())
}

/// Output amount for an exact input
///
/// Formula: output = (input * 997 * reserve_out) / (reserve_in * 1000 + input * 997)
pub fn get_amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> Result<U256, AmmError> {
    if amount_in.is_zero() {
        return Err(AmmError::InsufficientInput);
    }
    check_reserves(reserve_in, reserve_out)?;

    let amount_in_with_fee = mul(amount_in, U256::from(FEE_NUM))?;
    let numerator = mul(amount_in_with_fee, reserve_out)?;
    let denominator = add(mul(reserve_in, U256::from(FEE_DENOM))?, amount_in_with_fee)?;
    Ok(numerator / denominator)
}

/// Required input for an exact output (reverse calculation)
///
/// Formula: input = (reserve_in * output * 1000) / ((reserve_out - output) * 997) + 1
pub fn get_amount_in(
    amount_out: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> Result<U256, AmmError> {
    if amount_out.is_zero() {
        return Err(AmmError::InsufficientInput);
    }
    check_reserves(reserve_in, reserve_out)?;
    if amount_out >= reserve_out {
        return Err(AmmError::InsufficientLiquidity); // Can't take the whole reserve
    }

    let numerator = mul(mul(reserve_in, amount_out)?, U256::from(FEE_DENOM))?;
    let denominator = mul(reserve_out - amount_out, U256::from(FEE_NUM))?;
    add(numerator / denominator, U256::from(1)) // Round up
}

/// Fee-less proportional quote, for liquidity-provision ratios only
///
/// Formula: amount_b = amount_a * reserve_b / reserve_a
pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256, AmmError> {
    if amount_a.is_zero() {
        return Err(AmmError::InsufficientInput);
    }
    check_reserves(reserve_a, reserve_b)?;
    Ok(mul(amount_a, reserve_b)? / reserve_a)
}

/// Deposit amounts that keep the pool ratio, given the most the caller is
/// willing to provide of each side.
///
/// Returns `(amount_a, amount_b)` with one side at its desired value.
pub fn optimal_liquidity_amounts(
    desired_a: U256,
    desired_b: U256,
    reserve_a: U256,
    reserve_b: U256,
) -> Result<(U256, U256), AmmError> {
    // An empty pool takes whatever ratio the first depositor sets
    if reserve_a.is_zero() && reserve_b.is_zero() {
        return Ok((desired_a, desired_b));
    }

    let b_for_a = quote(desired_a, reserve_a, reserve_b)?;
    if b_for_a <= desired_b {
        return Ok((desired_a, b_for_a));
    }
    let a_for_b = quote(desired_b, reserve_b, reserve_a)?;
    Ok((a_for_b, desired_b))
}

/// Price impact of one hop, in basis points.
///
/// Compares the realized output against the fee-less spot projection
/// `amount_in * reserve_out / reserve_in`. Never negative.
pub fn price_impact_bps(
    amount_in: U256,
    amount_out: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> Result<u64, AmmError> {
    if reserve_in.is_zero() {
        return Ok(0);
    }
    let ideal_out = mul(amount_in, reserve_out)? / reserve_in;
    if ideal_out.is_zero() || amount_out >= ideal_out {
        return Ok(0);
    }
    let impact = mul(ideal_out - amount_out, U256::from(BPS))? / ideal_out;
    Ok(impact.saturating_to::<u64>())
}

/// Apply slippage tolerance to an output amount, rounding toward zero.
///
/// Formula: min = floor(amount * (10000 - bps) / 10000)
pub fn apply_slippage(amount: U256, slippage_bps: u32) -> Result<U256, AmmError> {
    let bps = u64::from(slippage_bps);
    if bps > BPS {
        return Err(AmmError::InvalidSlippage(slippage_bps));
    }
    Ok(mul(amount, U256::from(BPS - bps))? / U256::from(BPS))
}

/// Chain `get_amount_out` through a sequence of `(reserve_in, reserve_out)` hops.
///
/// Returns every intermediate amount, starting with `amount_in`.
pub fn get_amounts_out(amount_in: U256, hops: &[(U256, U256)]) -> Result<Vec<U256>, AmmError> {
    let mut amounts = Vec::with_capacity(hops.len() + 1);
    amounts.push(amount_in);
    let mut current = amount_in;
    for &(reserve_in, reserve_out) in hops {
        current = get_amount_out(current, reserve_in, reserve_out)?;
        amounts.push(current);
    }
    Ok(amounts)
}

/// Chain `get_amount_in` backwards through the hops.
///
/// Returns every intermediate amount, ending with `amount_out`.
pub fn get_amounts_in(amount_out: U256, hops: &[(U256, U256)]) -> Result<Vec<U256>, AmmError> {
    let mut amounts = vec![U256::ZERO; hops.len() + 1];
    amounts[hops.len()] = amount_out;
    for (i, &(reserve_in, reserve_out)) in hops.iter().enumerate().rev() {
        amounts[i] = get_amount_in(amounts[i + 1], reserve_in, reserve_out)?;
    }
    Ok(amounts)
}

/// Output per unit of input (display only)
pub fn effective_rate(amount_in: U256, amount_out: U256) -> f64 {
    if amount_in.is_zero() {
        return 0.0;
    }
    amount_out.saturating_to::<u128>() as f64 / amount_in.saturating_to::<u128>() as f64
}
