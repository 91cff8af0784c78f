//! # Order Types
//!
//! Long-term order records and the results handed back to the custody layer.

use std::fmt;

use crate::types::reward_factor::RewardFactor;

/// Identifier assigned to each long-term order
pub type OrderId = u64;

/// Which of the two pool tokens an order sells
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenIndex {
    Token0,
    Token1,
}

impl TokenIndex {
    /// The opposite token of the pair
    pub fn other(self) -> Self {
        match self {
            TokenIndex::Token0 => TokenIndex::Token1,
            TokenIndex::Token1 => TokenIndex::Token0,
        }
    }
}

/// 32-byte account id of an order owner, assigned by the custody layer
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct Owner(pub [u8; 32]);

impl Owner {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owner({})", self)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..")
    }
}

/// Lifecycle of a long-term order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderState {
    /// Selling, or expired with proceeds still unclaimed
    Active,
    /// Cancelled before expiry; unsold principal refunded
    Cancelled,
    /// Final proceeds withdrawn after expiry
    Completed,
}

/// A single long-term order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct LongTermOrder {
    pub id: OrderId,
    pub owner: Owner,
    /// Token being sold
    pub sell_token: TokenIndex,
    /// Amount sold per block
    pub sales_rate: u128,
    /// Block the order started selling
    pub start_block: u64,
    /// Grid-aligned block at which the order stops selling
    pub expiry_block: u64,
    /// Reward factor at placement or at the last withdrawal
    pub reward_factor_at_submission: RewardFactor,
    pub state: OrderState,
}

impl LongTermOrder {
    /// Order has reached its expiry block
    pub fn is_expired(&self, block: u64) -> bool {
        block >= self.expiry_block
    }

    /// Principal committed when the order was placed
    pub fn amount_in(&self) -> u128 {
        self.sales_rate * (self.expiry_block - self.start_block) as u128
    }
}

/// Result of placing a long-term order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacedOrder {
    pub id: OrderId,
    pub sales_rate: u128,
    pub expiry_block: u64,
    /// Amount custody must collect: `sales_rate * (expiry_block - start_block)`
    pub amount_in: u128,
}

/// Result of cancelling a long-term order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct CancelledOrder {
    /// Unsold principal, in the sell token
    pub refund: u128,
    /// Accrued proceeds, in the other token
    pub proceeds: u128,
}

/// Result of withdrawing proceeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct WithdrawnProceeds {
    pub proceeds: u128,
    /// The withdrawal was the terminal one after expiry
    pub completed: bool,
}
