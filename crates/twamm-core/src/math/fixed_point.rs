//! # Fixed-Point Arithmetic
//!
//! Q64.64 fixed-point operations used by the swap formula and the reward
//! factor accounting. Everything here is integer-only so the quoting path
//! and the executing path agree bit for bit.

use ethnum::U256;

use crate::constants::{EXP_ARG_CAP_Q64, LN_2_Q64, Q64};
use crate::errors::{CoreResult, TwammError};
use crate::math::big_int::{mul_div_u128, sqrt_u256, to_u128, Rounding};
use crate::math::safe_math::{safe_add_u128, safe_div_u128};

// ============================================================================
// Basic Fixed-Point Arithmetic
// ============================================================================

/// Multiply two Q64 fixed-point numbers
pub fn mul_q64(a: u128, b: u128, rounding: Rounding) -> CoreResult<u128> {
    mul_div_u128(a, b, Q64, rounding)
}

/// Square root of an integer, returned in Q64.64
pub fn sqrt_q64(value: u128) -> u128 {
    // sqrt(v * 2^128) = sqrt(v) * 2^64, and sqrt of a 256-bit value fits in u128
    let root = sqrt_u256(U256::new(value) << 128u32);
    to_u128(root).unwrap_or(u128::MAX)
}

/// Exponential function e^x in Q64.64 fixed point for `0 <= x <= 44`
///
/// Range-reduces by ln(2) so the Taylor series only sees `r` in `[0, ln 2)`,
/// then shifts the result back up by the integer power of two.
pub fn exp_q64(x: u128) -> CoreResult<u128> {
    if x > EXP_ARG_CAP_Q64 {
        return Err(TwammError::MathOverflow);
    }
    if x == 0 {
        return Ok(Q64); // e^0 = 1
    }

    let n = (x / LN_2_Q64) as u32;
    let r = x - (n as u128) * LN_2_Q64;

    // e^r = 1 + r + r^2/2! + ... until the terms vanish at Q64 resolution
    let mut result = Q64;
    let mut term = Q64;
    let mut i = 1u128;
    loop {
        term = safe_div_u128(mul_q64(term, r, Rounding::Down)?, i)?;
        if term == 0 {
            break;
        }
        result = safe_add_u128(result, term)?;
        i += 1;
    }

    if result.leading_zeros() < n {
        return Err(TwammError::MathOverflow);
    }
    Ok(result << n)
}

// ============================================================================
// Reward Factor Helpers
// ============================================================================

/// `amount / rate` as a 256-bit Q64.64 value, rounded down
pub fn div_to_q64_u256(amount: u128, rate: u128) -> CoreResult<U256> {
    if rate == 0 {
        return Err(TwammError::DivisionByZero);
    }
    Ok((U256::new(amount) << 64u32) / U256::new(rate))
}

/// `factor * rate` for a 256-bit Q64.64 factor, rounded down to an integer
pub fn mul_q64_u256(factor: U256, rate: u128) -> CoreResult<u128> {
    let product = factor
        .checked_mul(U256::new(rate))
        .ok_or(TwammError::MathOverflow)?;
    to_u128(product >> 64u32).ok_or(TwammError::MathOverflow)
}
