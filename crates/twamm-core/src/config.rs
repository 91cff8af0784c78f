//! # Pool Configuration
//!
//! Parameters fixed at pool creation: the order-block interval that quantizes
//! every expiry, and the swap fee charged on both short-term swaps and
//! virtual trades.

#[cfg(feature = "client")]
use std::fs;

use crate::constants::{DEFAULT_FEE_BPS, DEFAULT_ORDER_BLOCK_INTERVAL, MAX_FEE_BPS};
use crate::errors::{CoreResult, TwammError};

/// Pool configuration, loadable from TOML with the `client` feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(default))]
pub struct PoolConfig {
    /// Block grid to which all order expiries are aligned.
    /// Larger values mean fewer executor steps and coarser price updates.
    pub order_block_interval: u64,

    /// Fee in basis points, withheld from every amount sold into the pool
    pub fee_bps: u16,
}

impl PoolConfig {
    pub fn new(order_block_interval: u64, fee_bps: u16) -> CoreResult<Self> {
        let config = Self {
            order_block_interval,
            fee_bps,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.order_block_interval == 0 {
            return Err(TwammError::invalid_config("order_block_interval must be greater than 0"));
        }

        if self.fee_bps > MAX_FEE_BPS {
            return Err(TwammError::InvalidConfig(format!(
                "fee_bps {} exceeds {} (100%)",
                self.fee_bps, MAX_FEE_BPS
            )));
        }

        Ok(())
    }

    /// Parse and validate configuration from a TOML document
    #[cfg(feature = "client")]
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: PoolConfig = toml::from_str(content)
            .map_err(|e| TwammError::InvalidConfig(format!("failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    #[cfg(feature = "client")]
    pub fn load(path: &str) -> CoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TwammError::InvalidConfig(format!("failed to read config file {}: {}", path, e))
        })?;

        Self::from_toml_str(&content)
    }

    /// Serialize configuration to TOML
    #[cfg(feature = "client")]
    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TwammError::InvalidConfig(format!("failed to serialize config: {}", e)))
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            order_block_interval: DEFAULT_ORDER_BLOCK_INTERVAL,
            fee_bps: DEFAULT_FEE_BPS,
        }
    }
}
