//! # Reserve Types
//!
//! Pool balances and short-term swap results.

use ethnum::U256;

use crate::types::orders::TokenIndex;

/// Constant-product pool balances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct Reserves {
    pub reserve0: u128,
    pub reserve1: u128,
}

impl Reserves {
    pub fn new(reserve0: u128, reserve1: u128) -> Self {
        Self { reserve0, reserve1 }
    }

    /// Reserve of the given token
    pub fn get(&self, token: TokenIndex) -> u128 {
        match token {
            TokenIndex::Token0 => self.reserve0,
            TokenIndex::Token1 => self.reserve1,
        }
    }

    /// Mutable reserve of the given token
    pub fn get_mut(&mut self, token: TokenIndex) -> &mut u128 {
        match token {
            TokenIndex::Token0 => &mut self.reserve0,
            TokenIndex::Token1 => &mut self.reserve1,
        }
    }

    /// Both reserves are non-zero
    pub fn has_liquidity(&self) -> bool {
        self.reserve0 > 0 && self.reserve1 > 0
    }

    /// Constant-product invariant k
    pub fn product(&self) -> U256 {
        U256::new(self.reserve0) * U256::new(self.reserve1)
    }
}

/// Outcome of a short-term swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct SwapResult {
    /// Token paid into the pool
    pub token_in: TokenIndex,
    /// Amount paid in, fee included
    pub amount_in: u128,
    /// Amount of the other token paid out
    pub amount_out: u128,
    /// Fee withheld from `amount_in`
    pub fee_amount: u128,
    /// Reserves after the swap
    pub reserves_after: Reserves,
}
