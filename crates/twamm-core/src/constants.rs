//! # Protocol Constants
//!
//! Fixed-point scales, numeric bounds of the transcendental routines and
//! configuration defaults.

// ============================================================================
// Mathematical Constants
// ============================================================================

/// Q64 fixed-point scale factor: 2^64
pub const Q64: u128 = 1u128 << 64;

/// ln(2) in Q64.64
pub const LN_2_Q64: u128 = 12_786_308_645_202_655_659;

/// Largest exponent argument accepted by `exp_q64` (44.0 in Q64.64).
/// e^44 * 2^64 still fits in a u128.
pub const EXP_ARG_CAP_Q64: u128 = 44 * Q64;

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Maximum fee in basis points (100%)
pub const MAX_FEE_BPS: u16 = 10_000;

// ============================================================================
// Order Book Defaults
// ============================================================================

/// Default order-block interval
pub const DEFAULT_ORDER_BLOCK_INTERVAL: u64 = 10;

/// Default swap fee in basis points
pub const DEFAULT_FEE_BPS: u16 = 0;
