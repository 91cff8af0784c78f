//! # Core Error Types
//!
//! Errors surfaced by the engine. Validation errors are local and can be
//! retried with corrected input; invariant errors are unreachable within the
//! supported numeric domain.

use thiserror::Error;

/// Errors raised by pool, order book and math operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum TwammError {
    // ========================================================================
    // Math Errors
    // ========================================================================

    #[error("Math overflow")]
    MathOverflow,

    #[error("Math underflow")]
    MathUnderflow,

    #[error("Division by zero")]
    DivisionByZero,

    // ========================================================================
    // Validation Errors
    // ========================================================================

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Number of intervals must be positive")]
    InvalidIntervals,

    #[error("Sales rate rounds to zero")]
    ZeroSalesRate,

    #[error("Invalid expiry block {0}")]
    InvalidExpiry(u64),

    #[error("Block {block} is before last virtual order block {last}")]
    BlockInPast { block: u64, last: u64 },

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Slippage exceeded: got {actual}, wanted at least {minimum}")]
    SlippageExceeded { actual: u128, minimum: u128 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Order Errors
    // ========================================================================

    #[error("Order {0} not found")]
    OrderNotFound(u64),

    #[error("Caller is not the order owner")]
    NotOrderOwner,

    #[error("Order is not active")]
    OrderNotActive,

    #[error("No proceeds to withdraw")]
    NothingToWithdraw,

    // ========================================================================
    // Invariant Errors
    // ========================================================================

    #[error("Degenerate reserves")]
    DegenerateReserves,

    #[error("Order book has not executed virtual orders up to block {0}")]
    StaleVirtualState(u64),
}

/// Result type using core errors
pub type CoreResult<T> = Result<T, TwammError>;

// Helper functions for creating specific errors
impl TwammError {
    /// Create an invalid config error with reason
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig(reason.to_string())
    }

    /// True for errors that indicate a broken engine invariant rather than bad input
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::MathOverflow
                | Self::MathUnderflow
                | Self::DivisionByZero
                | Self::DegenerateReserves
                | Self::StaleVirtualState(_)
        )
    }
}
