//! # Core Types
//!
//! Plain data shared by the order book, the executor and the pool facade.

pub mod orders;
pub mod reserves;
pub mod reward_factor;

pub use orders::*;
pub use reserves::*;
pub use reward_factor::*;
