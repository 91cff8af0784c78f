//! # Safe Math Operations
//!
//! Overflow-checked arithmetic for amounts, sales rates, block numbers and
//! 256-bit reward factors.

use ethnum::U256;

use crate::constants::BPS_DENOMINATOR;
use crate::errors::{CoreResult, TwammError};
use crate::math::big_int::{mul_div_u128, Rounding};

/// Macro to generate safe arithmetic functions
macro_rules! safe_arith {
    // Binary operations with checked methods
    ($fn_name:ident, $type:ty, $checked_method:ident, $error:expr) => {
        /// Checked arithmetic, mapping overflow/underflow to a typed error
        pub fn $fn_name(a: $type, b: $type) -> CoreResult<$type> {
            a.$checked_method(b).ok_or($error)
        }
    };

    // Division operations with zero check
    (div, $fn_name:ident, $type:ty) => {
        /// Safe division with zero check
        pub fn $fn_name(a: $type, b: $type) -> CoreResult<$type> {
            if b == 0 {
                return Err(TwammError::DivisionByZero);
            }
            Ok(a / b)
        }
    };
}

// Block arithmetic
safe_arith!(safe_add_u64, u64, checked_add, TwammError::MathOverflow);
safe_arith!(safe_sub_u64, u64, checked_sub, TwammError::MathUnderflow);
safe_arith!(safe_mul_u64, u64, checked_mul, TwammError::MathOverflow);

// Amounts and sales rates
safe_arith!(safe_add_u128, u128, checked_add, TwammError::MathOverflow);
safe_arith!(safe_sub_u128, u128, checked_sub, TwammError::MathUnderflow);
safe_arith!(safe_mul_u128, u128, checked_mul, TwammError::MathOverflow);
safe_arith!(div, safe_div_u128, u128);

// Reward factors
safe_arith!(safe_add_u256, U256, checked_add, TwammError::MathOverflow);
safe_arith!(safe_sub_u256, U256, checked_sub, TwammError::MathUnderflow);

/// Fee share of `amount` in basis points, rounded up so the pool never
/// undercharges
pub fn safe_calculate_fee(amount: u128, fee_bps: u16) -> CoreResult<u128> {
    if fee_bps as u128 > BPS_DENOMINATOR {
        return Err(TwammError::MathOverflow);
    }
    mul_div_u128(amount, fee_bps as u128, BPS_DENOMINATOR, Rounding::Up)
}
