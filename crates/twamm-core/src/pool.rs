//! # TWAMM Pool
//!
//! Facade used by the custody layer. Owns the reserves, the configuration
//! and the long-term order book.
//!
//! Every operation first executes virtual orders up to the supplied block and
//! then applies its own effect. Operations are all-or-nothing: the virtual
//! state and reserves are checkpointed before execution and restored if any
//! step fails.

use crate::config::PoolConfig;
use crate::errors::{CoreResult, TwammError};
use crate::executor::{advance_to, ExecutionReport};
use crate::math::safe_math::{safe_add_u128, safe_sub_u128};
use crate::order_book::LongTermOrderBook;
use crate::swap_formula::quote_swap;
use crate::types::{
    CancelledOrder, OrderId, Owner, PlacedOrder, Reserves, SwapResult, TokenIndex,
    WithdrawnProceeds,
};

/// Constant-product pool with long-term orders
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TwammPool {
    config: PoolConfig,
    reserves: Reserves,
    book: LongTermOrderBook,
}

impl TwammPool {
    /// Create an empty pool whose virtual orders start at `genesis_block`
    pub fn new(config: PoolConfig, genesis_block: u64) -> CoreResult<Self> {
        config.validate()?;

        log::info!(
            "Created pool at block {} (interval {}, fee {} bps)",
            genesis_block,
            config.order_block_interval,
            config.fee_bps
        );

        Ok(Self {
            config,
            reserves: Reserves::default(),
            book: LongTermOrderBook::new(config.order_block_interval, genesis_block),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn reserves(&self) -> Reserves {
        self.reserves
    }

    pub fn order_book(&self) -> &LongTermOrderBook {
        &self.book
    }

    pub fn last_virtual_order_block(&self) -> u64 {
        self.book.last_virtual_order_block()
    }

    fn ensure_not_in_past(&self, block: u64) -> CoreResult<()> {
        let last = self.last_virtual_order_block();
        if block < last {
            return Err(TwammError::BlockInPast { block, last });
        }
        Ok(())
    }

    /// Execute virtual orders to `block`, then run `op`. On any error the
    /// virtual state and reserves are rolled back.
    fn run_atomically<T>(
        &mut self,
        block: u64,
        op: impl FnOnce(&mut Self, ExecutionReport) -> CoreResult<T>,
    ) -> CoreResult<T> {
        self.ensure_not_in_past(block)?;

        let checkpoint = (self.book.virtual_state().clone(), self.reserves);
        let fee_bps = self.config.fee_bps;

        let result = self
            .book
            .execute_virtual_orders(&mut self.reserves, fee_bps, block)
            .and_then(|report| op(self, report));

        if let Err(err) = &result {
            let restored_block = checkpoint.0.last_virtual_order_block;
            if err.is_invariant_violation() {
                log::error!(
                    "Rolling back to block {} after invariant failure: {}",
                    restored_block,
                    err
                );
            } else {
                log::debug!("Rolling back to block {} after error: {}", restored_block, err);
            }
            let (virtual_state, reserves) = checkpoint;
            self.book.restore_virtual_state(virtual_state);
            self.reserves = reserves;
        }

        result
    }

    // ========================================================================
    // Virtual Order Execution
    // ========================================================================

    /// Execute pending virtual orders up to `block`
    pub fn execute_virtual_orders(&mut self, block: u64) -> CoreResult<ExecutionReport> {
        self.run_atomically(block, |_, report| Ok(report))
    }

    /// Reserves after executing virtual orders to `block`, without changing
    /// the pool
    pub fn quote_reserves(&self, block: u64) -> CoreResult<Reserves> {
        self.ensure_not_in_past(block)?;

        let mut virtual_state = self.book.virtual_state().clone();
        let mut reserves = self.reserves;
        advance_to(
            &mut virtual_state,
            &mut reserves,
            self.config.order_block_interval,
            self.config.fee_bps,
            block,
        )?;

        Ok(reserves)
    }

    /// Proceeds order `id` could withdraw at `block`, without changing the pool
    pub fn quote_proceeds(&self, id: OrderId, block: u64) -> CoreResult<u128> {
        self.ensure_not_in_past(block)?;

        let mut book = self.book.clone();
        let mut reserves = self.reserves;
        book.execute_virtual_orders(&mut reserves, self.config.fee_bps, block)?;
        book.claimable_proceeds(id)
    }

    // ========================================================================
    // Liquidity
    // ========================================================================

    /// Add liquidity. The first deposit must fund both sides.
    pub fn mint(&mut self, amount0: u128, amount1: u128, block: u64) -> CoreResult<Reserves> {
        self.run_atomically(block, |pool, _| {
            if amount0 == 0 && amount1 == 0 {
                return Err(TwammError::InvalidAmount);
            }

            let reserves = Reserves::new(
                safe_add_u128(pool.reserves.reserve0, amount0)?,
                safe_add_u128(pool.reserves.reserve1, amount1)?,
            );
            if !reserves.has_liquidity() {
                return Err(TwammError::InvalidAmount);
            }

            pool.reserves = reserves;
            log::debug!("Minted {}/{} at block {}", amount0, amount1, block);
            Ok(reserves)
        })
    }

    /// Remove liquidity. Neither reserve may reach zero.
    pub fn burn(&mut self, amount0: u128, amount1: u128, block: u64) -> CoreResult<Reserves> {
        self.run_atomically(block, |pool, _| {
            if amount0 == 0 && amount1 == 0 {
                return Err(TwammError::InvalidAmount);
            }
            if amount0 >= pool.reserves.reserve0 || amount1 >= pool.reserves.reserve1 {
                return Err(TwammError::InsufficientLiquidity);
            }

            let reserves = Reserves::new(
                safe_sub_u128(pool.reserves.reserve0, amount0)?,
                safe_sub_u128(pool.reserves.reserve1, amount1)?,
            );

            pool.reserves = reserves;
            log::debug!("Burned {}/{} at block {}", amount0, amount1, block);
            Ok(reserves)
        })
    }

    // ========================================================================
    // Short-Term Swaps
    // ========================================================================

    /// Exact-in swap against the reserves left after virtual execution
    pub fn swap(
        &mut self,
        token_in: TokenIndex,
        amount_in: u128,
        min_amount_out: u128,
        block: u64,
    ) -> CoreResult<SwapResult> {
        self.run_atomically(block, |pool, _| {
            let result = quote_swap(pool.reserves, token_in, amount_in, pool.config.fee_bps)?;
            if result.amount_out < min_amount_out {
                return Err(TwammError::SlippageExceeded {
                    actual: result.amount_out,
                    minimum: min_amount_out,
                });
            }

            pool.reserves = result.reserves_after;
            log::debug!(
                "Swapped {} of {:?} for {} at block {} (fee {})",
                result.amount_in,
                token_in,
                result.amount_out,
                block,
                result.fee_amount
            );
            Ok(result)
        })
    }

    // ========================================================================
    // Long-Term Orders
    // ========================================================================

    /// Place a long-term order; custody collects `amount_in` of the result
    pub fn place_long_term_order(
        &mut self,
        owner: Owner,
        sell_token: TokenIndex,
        amount: u128,
        num_intervals: u64,
        block: u64,
    ) -> CoreResult<PlacedOrder> {
        self.run_atomically(block, |pool, _| {
            if !pool.reserves.has_liquidity() {
                return Err(TwammError::InsufficientLiquidity);
            }
            pool.book.place_order(owner, sell_token, amount, num_intervals, block)
        })
    }

    /// Cancel a long-term order; custody pays out the refund and proceeds
    pub fn cancel_long_term_order(
        &mut self,
        owner: Owner,
        id: OrderId,
        block: u64,
    ) -> CoreResult<CancelledOrder> {
        self.run_atomically(block, |pool, _| pool.book.cancel_order(owner, id, block))
    }

    /// Withdraw the proceeds of a long-term order
    pub fn withdraw_proceeds(
        &mut self,
        owner: Owner,
        id: OrderId,
        block: u64,
    ) -> CoreResult<WithdrawnProceeds> {
        self.run_atomically(block, |pool, _| pool.book.withdraw_proceeds(owner, id, block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Owner = Owner::new([0xA1; 32]);

    fn funded_pool(reserve: u128) -> TwammPool {
        let mut pool = TwammPool::new(PoolConfig::default(), 0).unwrap();
        pool.mint(reserve, reserve, 0).unwrap();
        pool
    }

    #[test]
    fn test_new_validates_config() {
        let config = PoolConfig {
            order_block_interval: 0,
            fee_bps: 0,
        };
        assert!(matches!(TwammPool::new(config, 0), Err(TwammError::InvalidConfig(_))));
    }

    #[test]
    fn test_mint_rules() {
        let mut pool = TwammPool::new(PoolConfig::default(), 0).unwrap();
        assert_eq!(pool.mint(0, 0, 0), Err(TwammError::InvalidAmount));
        assert_eq!(pool.mint(100, 0, 0), Err(TwammError::InvalidAmount));
        assert_eq!(pool.reserves(), Reserves::default());

        assert_eq!(pool.mint(100, 200, 0).unwrap(), Reserves::new(100, 200));
        // One-sided top-up is fine once both sides exist
        assert_eq!(pool.mint(50, 0, 3).unwrap(), Reserves::new(150, 200));
        assert_eq!(pool.last_virtual_order_block(), 3);
    }

    #[test]
    fn test_burn_keeps_liquidity() {
        let mut pool = funded_pool(1_000);
        assert_eq!(pool.burn(1_000, 0, 1), Err(TwammError::InsufficientLiquidity));
        assert_eq!(pool.burn(0, 0, 1), Err(TwammError::InvalidAmount));
        assert_eq!(pool.burn(400, 999, 1).unwrap(), Reserves::new(600, 1));
    }

    #[test]
    fn test_swap_with_slippage() {
        let mut pool = funded_pool(1_000_000);
        assert_eq!(
            pool.swap(TokenIndex::Token0, 1_000, 1_000, 1),
            Err(TwammError::SlippageExceeded {
                actual: 999,
                minimum: 1_000
            })
        );
        assert_eq!(pool.reserves(), Reserves::new(1_000_000, 1_000_000));

        let result = pool.swap(TokenIndex::Token0, 1_000, 999, 1).unwrap();
        assert_eq!(result.amount_out, 999);
        assert_eq!(pool.reserves(), Reserves::new(1_001_000, 999_001));
    }

    #[test]
    fn test_block_in_past_rejected() {
        let mut pool = funded_pool(1_000_000);
        pool.execute_virtual_orders(30).unwrap();
        assert_eq!(
            pool.swap(TokenIndex::Token1, 10, 0, 29),
            Err(TwammError::BlockInPast { block: 29, last: 30 })
        );
        assert_eq!(pool.quote_reserves(5), Err(TwammError::BlockInPast { block: 5, last: 30 }));
    }

    #[test]
    fn test_place_requires_liquidity() {
        let mut pool = TwammPool::new(PoolConfig::default(), 0).unwrap();
        assert_eq!(
            pool.place_long_term_order(ALICE, TokenIndex::Token0, 1_000, 2, 0),
            Err(TwammError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_failed_operation_rolls_back_execution() {
        let mut pool = funded_pool(1_000_000);
        pool.place_long_term_order(ALICE, TokenIndex::Token0, 10_000, 5, 0).unwrap();
        let before = pool.clone();

        // Execution to 25 succeeds but the swap fails, so nothing moves
        assert!(matches!(
            pool.swap(TokenIndex::Token1, 1_000, u128::MAX, 25),
            Err(TwammError::SlippageExceeded { .. })
        ));
        assert_eq!(pool, before);

        assert_eq!(pool.withdraw_proceeds(ALICE, 42, 25), Err(TwammError::OrderNotFound(42)));
        assert_eq!(pool, before);
    }

    #[test]
    fn test_quotes_do_not_mutate() {
        let mut pool = funded_pool(1_000_000);
        let placed = pool.place_long_term_order(ALICE, TokenIndex::Token1, 10_000, 5, 0).unwrap();
        let before = pool.clone();

        let quoted = pool.quote_reserves(37).unwrap();
        let claimable = pool.quote_proceeds(placed.id, 37).unwrap();
        assert_eq!(pool, before);

        pool.execute_virtual_orders(37).unwrap();
        assert_eq!(pool.reserves(), quoted);
        assert_eq!(pool.order_book().claimable_proceeds(placed.id).unwrap(), claimable);
    }
}
