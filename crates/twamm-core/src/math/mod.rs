//! # Mathematical Functions
//!
//! Deterministic integer and fixed-point routines shared by the swap formula,
//! the order pools and the pool facade.

pub mod big_int;
pub mod fixed_point;
pub mod safe_math;

// Re-export commonly used functions
pub use big_int::*;
pub use fixed_point::*;
pub use safe_math::*;

pub use ethnum::U256;
