//! # Virtual Trade Solvers
//!
//! Constant-product solutions for the amounts two opposing constant-rate
//! order flows exchange over one executor step.
//!
//! With `k = r0 * r1` the two-sided closed form is
//!
//! ```text
//! c      = (sqrt(r0 * s1) - sqrt(r1 * s0)) / (sqrt(r0 * s1) + sqrt(r1 * s0))
//! E      = exp(2 * sqrt(s0 * s1 / k))
//! new_r0 = sqrt(k * s0 / s1) * (E + c) / (E - c)
//! new_r1 = k / new_r0
//! ```
//!
//! `sqrt(k * s0 / s1)` is evaluated as `r0 * sqrt(r1 * s0) / sqrt(r0 * s1)`,
//! reusing the two terms of `c`. The solver computes whichever reserve ends up
//! larger and derives the other from `k`. The derived reserve rounds up and
//! both are clamped to the no-negative-output range, so the pool keeps the
//! rounding and the product never decreases.

use ethnum::U256;

use crate::constants::{EXP_ARG_CAP_Q64, Q64};
use crate::errors::{CoreResult, TwammError};
use crate::math::big_int::{div_rounding, mul_div_u128, mul_div_wide, q64_ratio, to_u128, Rounding};
use crate::math::fixed_point::{exp_q64, sqrt_q64};
use crate::math::safe_math::{safe_add_u128, safe_add_u256, safe_calculate_fee, safe_sub_u128};
use crate::types::{Reserves, SwapResult, TokenIndex};

/// Reserves after a virtual trade and the amounts that left the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualTrade {
    pub reserves: Reserves,
    /// Token0 paid out; proceeds of the token1 sellers
    pub token0_out: u128,
    /// Token1 paid out; proceeds of the token0 sellers
    pub token1_out: u128,
}

impl VirtualTrade {
    /// Proceeds owed to the sellers of `sell_token`
    pub fn proceeds_for(&self, sell_token: TokenIndex) -> u128 {
        match sell_token {
            TokenIndex::Token0 => self.token1_out,
            TokenIndex::Token1 => self.token0_out,
        }
    }
}

/// Output of an exact-in constant-product swap, rounded down
pub fn one_sided_out(reserve_in: u128, reserve_out: u128, amount_in: u128) -> CoreResult<u128> {
    let denominator = safe_add_u128(reserve_in, amount_in)?;
    mul_div_u128(reserve_out, amount_in, denominator, Rounding::Down)
}

/// Solve a virtual trade without fees.
///
/// `sell0` of token0 and `sell1` of token1 enter the pool concurrently.
pub fn swap_reserves(reserves: Reserves, sell0: u128, sell1: u128) -> CoreResult<VirtualTrade> {
    if sell0 == 0 && sell1 == 0 {
        return Ok(VirtualTrade {
            reserves,
            token0_out: 0,
            token1_out: 0,
        });
    }

    if !reserves.has_liquidity() {
        return Err(TwammError::DegenerateReserves);
    }

    let Reserves { reserve0, reserve1 } = reserves;

    let (new_reserve0, new_reserve1) = if sell1 == 0 {
        let out = one_sided_out(reserve0, reserve1, sell0)?;
        (safe_add_u128(reserve0, sell0)?, safe_sub_u128(reserve1, out)?)
    } else if sell0 == 0 {
        let out = one_sided_out(reserve1, reserve0, sell1)?;
        (safe_sub_u128(reserve0, out)?, safe_add_u128(reserve1, sell1)?)
    } else {
        // Solve for the reserve that ends up larger; the smaller one follows from k
        let (new_reserve0, new_reserve1) = solve_two_sided(reserve0, reserve1, sell0, sell1)?;
        if new_reserve0 >= new_reserve1 {
            (new_reserve0, new_reserve1)
        } else {
            let (new_reserve1, new_reserve0) = solve_two_sided(reserve1, reserve0, sell1, sell0)?;
            (new_reserve0, new_reserve1)
        }
    };

    Ok(VirtualTrade {
        reserves: Reserves::new(new_reserve0, new_reserve1),
        token0_out: safe_sub_u128(safe_add_u128(reserve0, sell0)?, new_reserve0)?,
        token1_out: safe_sub_u128(safe_add_u128(reserve1, sell1)?, new_reserve1)?,
    })
}

/// Solve a virtual trade, withholding `fee_bps` from each sell amount.
///
/// The fee stays in the reserve of the token it was charged in, so
/// `token0_out = r0 + sell0 - r0_after` holds exactly.
pub fn virtual_trade(
    reserves: Reserves,
    sell0: u128,
    sell1: u128,
    fee_bps: u16,
) -> CoreResult<VirtualTrade> {
    let fee0 = safe_calculate_fee(sell0, fee_bps)?;
    let fee1 = safe_calculate_fee(sell1, fee_bps)?;

    let trade = swap_reserves(reserves, sell0 - fee0, sell1 - fee1)?;

    Ok(VirtualTrade {
        reserves: Reserves::new(
            safe_add_u128(trade.reserves.reserve0, fee0)?,
            safe_add_u128(trade.reserves.reserve1, fee1)?,
        ),
        ..trade
    })
}

/// Quote a short-term exact-in swap against `reserves`
pub fn quote_swap(
    reserves: Reserves,
    token_in: TokenIndex,
    amount_in: u128,
    fee_bps: u16,
) -> CoreResult<SwapResult> {
    if amount_in == 0 {
        return Err(TwammError::InvalidAmount);
    }
    if !reserves.has_liquidity() {
        return Err(TwammError::InsufficientLiquidity);
    }

    let fee_amount = safe_calculate_fee(amount_in, fee_bps)?;
    let reserve_in = reserves.get(token_in);
    let reserve_out = reserves.get(token_in.other());
    let amount_out = one_sided_out(reserve_in, reserve_out, amount_in - fee_amount)?;

    let mut reserves_after = reserves;
    *reserves_after.get_mut(token_in) = safe_add_u128(reserve_in, amount_in)?;
    *reserves_after.get_mut(token_in.other()) = safe_sub_u128(reserve_out, amount_out)?;

    Ok(SwapResult {
        token_in,
        amount_in,
        amount_out,
        fee_amount,
        reserves_after,
    })
}

fn solve_two_sided(
    reserve0: u128,
    reserve1: u128,
    sell0: u128,
    sell1: u128,
) -> CoreResult<(u128, u128)> {
    let root_reserve0 = U256::new(sqrt_q64(reserve0));
    let root_reserve1 = U256::new(sqrt_q64(reserve1));
    let root_sell0 = U256::new(sqrt_q64(sell0));
    let root_sell1 = U256::new(sqrt_q64(sell1));

    // sqrt(r0 * s1) and sqrt(r1 * s0) in Q128; each factor is below 2^128
    let term0 = root_reserve0 * root_sell1;
    let term1 = root_reserve1 * root_sell0;

    let sum = safe_add_u256(term0, term1)?;
    let (c_magnitude, c_negative) = if term0 >= term1 {
        (q64_ratio(term0 - term1, sum)?, false)
    } else {
        (q64_ratio(term1 - term0, sum)?, true)
    };

    // 2 * sqrt(s0 * s1 / k); past the cap (E + c) / (E - c) is 1 to within a few ulps
    let exponent_arg = match q64_ratio(root_sell0 * root_sell1, root_reserve0 * root_reserve1) {
        Ok(ratio) => ratio.saturating_mul(2).min(EXP_ARG_CAP_Q64),
        Err(TwammError::MathOverflow) => EXP_ARG_CAP_Q64,
        Err(err) => return Err(err),
    };
    let exponent = exp_q64(exponent_arg)?;

    // |c| < 1 <= E, so the denominator stays positive
    let (numerator, denominator) = if c_negative {
        (safe_sub_u128(exponent, c_magnitude)?, safe_add_u128(exponent, c_magnitude)?)
    } else {
        (safe_add_u128(exponent, c_magnitude)?, safe_sub_u128(exponent, c_magnitude)?)
    };
    let fraction = mul_div_u128(numerator, Q64, denominator, Rounding::Up)?;

    // sqrt(k * s0 / s1) * fraction = r0 * fraction * term1 / term0, in Q64
    let scaled = U256::new(reserve0) * U256::new(fraction);
    let new_reserve0 = match mul_div_wide(scaled, term1, term0) {
        Ok(value) => {
            to_u128(div_rounding(value, U256::new(Q64), Rounding::Up)?).unwrap_or(u128::MAX)
        }
        // Far above r0 + s0, the clamp applies
        Err(TwammError::MathOverflow) => u128::MAX,
        Err(err) => return Err(err),
    };

    // Keep both outputs non-negative; the lower bound caps new_r1 at r1 + s1
    let k = U256::new(reserve0) * U256::new(reserve1);
    let upper0 = safe_add_u128(reserve0, sell0)?;
    let lower0 = ceil_div_k(k, safe_add_u128(reserve1, sell1)?)?;
    let new_reserve0 = new_reserve0.max(lower0).min(upper0);
    let new_reserve1 = ceil_div_k(k, new_reserve0)?;

    Ok((new_reserve0, new_reserve1))
}

fn ceil_div_k(k: U256, reserve: u128) -> CoreResult<u128> {
    to_u128(div_rounding(k, U256::new(reserve), Rounding::Up)?).ok_or(TwammError::MathOverflow)
}
