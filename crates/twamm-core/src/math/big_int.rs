//! Big integer operations for high-precision math
//!
//! This module provides the 256-bit mul-div, square root and ratio helpers
//! that keep fixed-point intermediates from overflowing.

use ethnum::U256;
use integer_sqrt::IntegerSquareRoot;

use crate::errors::{CoreResult, TwammError};

/// Rounding mode for division operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum Rounding {
    /// Round down (towards zero)
    Down,
    /// Round up (away from zero)
    Up,
}

/// Convert to u128, returning None if the high word is set
pub fn to_u128(value: U256) -> Option<u128> {
    let (hi, lo) = value.into_words();
    if hi == 0 {
        Some(lo)
    } else {
        None
    }
}

/// Divide with the requested rounding
pub fn div_rounding(numerator: U256, denominator: U256, rounding: Rounding) -> CoreResult<U256> {
    if denominator == U256::ZERO {
        return Err(TwammError::DivisionByZero);
    }

    let quotient = numerator / denominator;
    if rounding == Rounding::Up && numerator % denominator != U256::ZERO {
        return quotient.checked_add(U256::ONE).ok_or(TwammError::MathOverflow);
    }

    Ok(quotient)
}

/// Multiply two values and divide by a third with specified rounding
/// result = (a * b) / denominator
pub fn mul_div(a: U256, b: U256, denominator: U256, rounding: Rounding) -> CoreResult<U256> {
    if denominator == U256::ZERO {
        return Err(TwammError::DivisionByZero);
    }

    let product = a.checked_mul(b).ok_or(TwammError::MathOverflow)?;
    div_rounding(product, denominator, rounding)
}

/// Multiply two u128 values and divide by a third with specified rounding
pub fn mul_div_u128(a: u128, b: u128, denominator: u128, rounding: Rounding) -> CoreResult<u128> {
    // u128 * u128 always fits in 256 bits
    let result = mul_div(U256::new(a), U256::new(b), U256::new(denominator), rounding)?;
    to_u128(result).ok_or(TwammError::MathOverflow)
}

/// `a * b / denominator` for operands whose product may exceed 256 bits,
/// rounded up.
///
/// Exact when the product fits. Otherwise every operand keeps only its top
/// 128 bits, which bounds the relative error by 2^-126.
pub fn mul_div_wide(a: U256, b: U256, denominator: U256) -> CoreResult<U256> {
    if denominator == U256::ZERO {
        return Err(TwammError::DivisionByZero);
    }
    if let Some(product) = a.checked_mul(b) {
        return div_rounding(product, denominator, Rounding::Up);
    }

    let shift_a = significant_bits(a).saturating_sub(128);
    let shift_b = significant_bits(b).saturating_sub(128);
    let shift_d = significant_bits(denominator).saturating_sub(128);

    // Both factors are below 2^128 now; left-align the product for the division
    let product = (a >> shift_a) * (b >> shift_b);
    let norm = product.leading_zeros();
    let quotient = div_rounding(product << norm, denominator >> shift_d, Rounding::Up)?;

    let exponent = (shift_a + shift_b) as i64 - (shift_d + norm) as i64;
    if exponent >= 0 {
        let exponent = exponent as u32;
        if quotient.leading_zeros() < exponent {
            return Err(TwammError::MathOverflow);
        }
        Ok(quotient << exponent)
    } else {
        let shift = exponent.unsigned_abs() as u32;
        if shift >= 256 {
            return Ok(U256::ONE);
        }
        let truncated = quotient >> shift;
        if truncated << shift != quotient {
            return Ok(truncated + U256::ONE);
        }
        Ok(truncated)
    }
}

fn significant_bits(value: U256) -> u32 {
    256 - value.leading_zeros()
}

/// Floor square root of a 128-bit value
pub fn sqrt_u128(n: u128) -> u128 {
    n.integer_sqrt()
}

/// Floor square root of a 256-bit value
pub fn sqrt_u256(n: U256) -> U256 {
    let (hi, lo) = n.into_words();
    if hi == 0 {
        return U256::new(sqrt_u128(lo));
    }

    // sqrt(hi * 2^128 + lo) < (isqrt(hi) + 1) * 2^64, so Newton starts from above
    let mut x = U256::new(hi.integer_sqrt() + 1) << 64u32;
    loop {
        let y = (x + n / x) >> 1u32;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Ratio `num / den` in Q64.64, rounded down.
///
/// Both operands are shifted right together when `num << 64` would not fit in
/// 256 bits. The dropped low bits change the ratio by at most 2^-190 relative.
pub fn q64_ratio(num: U256, den: U256) -> CoreResult<u128> {
    if den == U256::ZERO {
        return Err(TwammError::DivisionByZero);
    }

    let bits = 256 - num.leading_zeros();
    let (num, den) = if bits + 64 > 256 {
        let shift = bits + 64 - 256;
        (num >> shift, den >> shift)
    } else {
        (num, den)
    };

    if den == U256::ZERO {
        return Err(TwammError::MathOverflow);
    }

    to_u128((num << 64u32) / den).ok_or(TwammError::MathOverflow)
}
