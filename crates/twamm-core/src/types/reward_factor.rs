//! # Reward Factor
//!
//! Cumulative proceeds per unit of sales rate, in Q64.64 over 256 bits.

use ethnum::U256;

use crate::errors::CoreResult;
use crate::math::fixed_point::{div_to_q64_u256, mul_q64_u256};
use crate::math::safe_math::{safe_add_u256, safe_sub_u256};

/// Monotone accumulator of proceeds per unit of sales rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RewardFactor(pub U256);

impl RewardFactor {
    pub const ZERO: RewardFactor = RewardFactor(U256::ZERO);

    /// Factor after `proceeds` are shared across `sales_rate`
    pub fn accrue(self, proceeds: u128, sales_rate: u128) -> CoreResult<Self> {
        let delta = div_to_q64_u256(proceeds, sales_rate)?;
        Ok(RewardFactor(safe_add_u256(self.0, delta)?))
    }

    /// Proceeds owed to `sales_rate` for the growth between `earlier` and `self`
    pub fn proceeds_since(self, earlier: RewardFactor, sales_rate: u128) -> CoreResult<u128> {
        let growth = safe_sub_u256(self.0, earlier.0)?;
        mul_q64_u256(growth, sales_rate)
    }
}

// Decimal strings keep 256-bit factors readable in JSON snapshots
#[cfg(feature = "client")]
impl serde::Serialize for RewardFactor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

#[cfg(feature = "client")]
impl<'de> serde::Deserialize<'de> for RewardFactor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        U256::from_str_radix(&text, 10)
            .map(RewardFactor)
            .map_err(serde::de::Error::custom)
    }
}
