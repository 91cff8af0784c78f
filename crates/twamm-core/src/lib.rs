//! # TWAMM Core - Virtual Order Execution
//!
//! This crate contains the long-term order engine of a time-weighted average
//! market maker. It provides:
//!
//! - Deterministic fixed-point math (mul-div, square root, exponential)
//! - The constant-product virtual trade solvers
//! - Order pools with lazy reward-factor accounting
//! - The long-term order book and the interval-stepping executor
//! - A pool facade that executes virtual orders before every state change
//!
//! Token custody, governance and LP share accounting live outside this crate;
//! the pool only computes amounts and keeps the reserves they imply.
//!
//! ## Feature Flags
//!
//! - `client`: Enables serde serialization of pool state and TOML config loading

// Re-export all modules
pub mod config;
pub mod constants;
pub mod errors;
pub mod executor;
pub mod math;
pub mod order_book;
pub mod order_pool;
pub mod pool;
pub mod swap_formula;
pub mod types;

// Re-export commonly used items
pub use config::PoolConfig;
pub use constants::*;
pub use errors::{CoreResult, TwammError};
pub use executor::{advance_to, ExecutionReport};
pub use order_book::LongTermOrderBook;
pub use order_pool::OrderPool;
pub use pool::TwammPool;
pub use swap_formula::{swap_reserves, virtual_trade, VirtualTrade};
pub use types::*;
