//! # Order Pool
//!
//! Aggregate of every active long-term order selling one token.
//!
//! Orders never get iterated. The pool keeps one combined sales rate, the
//! rate that drops out at each expiry block, and a reward factor that grows by
//! `proceeds / sales_rate` whenever proceeds arrive. An order's claim is its
//! own sales rate times the growth since it last settled.

use std::collections::BTreeMap;

use crate::errors::{CoreResult, TwammError};
use crate::math::safe_math::{safe_add_u128, safe_sub_u128};
use crate::types::{LongTermOrder, RewardFactor};

/// Per-direction aggregate of long-term orders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderPool {
    /// Sum of the sales rates of unexpired orders
    current_sales_rate: u128,
    /// Cumulative proceeds per unit of sales rate
    reward_factor: RewardFactor,
    /// Aggregate rate leaving the pool at each expiry block
    sales_rate_ending_at_block: BTreeMap<u64, u128>,
    /// Reward factor at each processed expiry block still referenced by an order
    reward_factor_at_block: BTreeMap<u64, RewardFactor>,
    /// Orders per expiry block that may still read the expiry snapshot
    orders_ending_at_block: BTreeMap<u64, u64>,
}

impl OrderPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_sales_rate(&self) -> u128 {
        self.current_sales_rate
    }

    pub fn reward_factor(&self) -> RewardFactor {
        self.reward_factor
    }

    /// Rate that will stop selling at `block`
    pub fn sales_rate_ending_at(&self, block: u64) -> u128 {
        self.sales_rate_ending_at_block.get(&block).copied().unwrap_or(0)
    }

    /// Reward factor captured when the expiry at `block` was processed
    pub fn reward_factor_at(&self, block: u64) -> Option<RewardFactor> {
        self.reward_factor_at_block.get(&block).copied()
    }

    /// Number of future expiry blocks with pending rate
    pub fn pending_expiries(&self) -> usize {
        self.sales_rate_ending_at_block.len()
    }

    /// Register a new order's rate.
    ///
    /// The expiry must sit on the interval grid and strictly after `current_block`.
    pub fn record_new_order(
        &mut self,
        sales_rate: u128,
        expiry_block: u64,
        current_block: u64,
        interval: u64,
    ) -> CoreResult<()> {
        if interval == 0 || expiry_block % interval != 0 || expiry_block <= current_block {
            return Err(TwammError::InvalidExpiry(expiry_block));
        }

        let ending = safe_add_u128(self.sales_rate_ending_at(expiry_block), sales_rate)?;
        self.current_sales_rate = safe_add_u128(self.current_sales_rate, sales_rate)?;
        self.sales_rate_ending_at_block.insert(expiry_block, ending);
        *self.orders_ending_at_block.entry(expiry_block).or_insert(0) += 1;

        Ok(())
    }

    /// Withdraw a cancelled order's remaining rate so its expiry does not
    /// subtract it a second time
    pub fn remove_order(&mut self, sales_rate: u128, expiry_block: u64) -> CoreResult<()> {
        let ending = safe_sub_u128(self.sales_rate_ending_at(expiry_block), sales_rate)?;
        self.current_sales_rate = safe_sub_u128(self.current_sales_rate, sales_rate)?;

        if ending == 0 {
            self.sales_rate_ending_at_block.remove(&expiry_block);
        } else {
            self.sales_rate_ending_at_block.insert(expiry_block, ending);
        }
        self.release_expiry(expiry_block);

        Ok(())
    }

    /// Drop the rate of orders ending at `block` and snapshot the reward factor.
    ///
    /// Calling it again for the same block subtracts nothing and keeps the
    /// first snapshot. Returns the rate that expired.
    pub fn expire_to_block(&mut self, block: u64) -> CoreResult<u128> {
        let Some(expiring) = self.sales_rate_ending_at_block.get(&block).copied() else {
            return Ok(0);
        };

        self.current_sales_rate = safe_sub_u128(self.current_sales_rate, expiring)?;
        self.sales_rate_ending_at_block.remove(&block);
        self.reward_factor_at_block.insert(block, self.reward_factor);

        Ok(expiring)
    }

    /// Share `proceeds` across the current sales rate.
    ///
    /// Returns the part that could not be distributed: everything when no
    /// order is selling. The per-unit share rounds down, so dust stays with
    /// the pool.
    pub fn distribute(&mut self, proceeds: u128) -> CoreResult<u128> {
        if proceeds == 0 {
            return Ok(0);
        }

        if self.current_sales_rate == 0 {
            log::warn!("No active sales rate; returning {} undistributed proceeds", proceeds);
            return Ok(proceeds);
        }

        self.reward_factor = self.reward_factor.accrue(proceeds, self.current_sales_rate)?;
        Ok(0)
    }

    /// Reward factor an order's proceeds are measured against.
    ///
    /// Live factor while the order sells; once its expiry has been executed,
    /// the snapshot taken at expiry so later sales are excluded.
    pub fn settled_factor(
        &self,
        order: &LongTermOrder,
        last_virtual_order_block: u64,
    ) -> CoreResult<RewardFactor> {
        if order.is_expired(last_virtual_order_block) {
            self.reward_factor_at(order.expiry_block)
                .ok_or(TwammError::StaleVirtualState(order.expiry_block))
        } else {
            Ok(self.reward_factor)
        }
    }

    /// Proceeds accrued to `order` since its last settlement
    pub fn proceeds_of(
        &self,
        order: &LongTermOrder,
        last_virtual_order_block: u64,
    ) -> CoreResult<u128> {
        self.settled_factor(order, last_virtual_order_block)?
            .proceeds_since(order.reward_factor_at_submission, order.sales_rate)
    }

    /// An order ending at `expiry_block` no longer needs the expiry snapshot
    pub fn release_expiry(&mut self, expiry_block: u64) {
        let remaining = match self.orders_ending_at_block.get_mut(&expiry_block) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };

        if remaining == 0 {
            self.orders_ending_at_block.remove(&expiry_block);
            self.reward_factor_at_block.remove(&expiry_block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderState, Owner, TokenIndex};

    fn order(
        sales_rate: u128,
        start_block: u64,
        expiry_block: u64,
        pool: &OrderPool,
    ) -> LongTermOrder {
        LongTermOrder {
            id: 0,
            owner: Owner::default(),
            sell_token: TokenIndex::Token0,
            sales_rate,
            start_block,
            expiry_block,
            reward_factor_at_submission: pool.reward_factor(),
            state: OrderState::Active,
        }
    }

    #[test]
    fn test_record_new_order() {
        let mut pool = OrderPool::new();
        pool.record_new_order(100, 20, 3, 10).unwrap();
        pool.record_new_order(50, 20, 3, 10).unwrap();
        pool.record_new_order(7, 30, 3, 10).unwrap();

        assert_eq!(pool.current_sales_rate(), 157);
        assert_eq!(pool.sales_rate_ending_at(20), 150);
        assert_eq!(pool.sales_rate_ending_at(30), 7);
        assert_eq!(pool.pending_expiries(), 2);
    }

    #[test]
    fn test_record_rejects_bad_expiry() {
        let mut pool = OrderPool::new();
        assert_eq!(pool.record_new_order(1, 25, 3, 10), Err(TwammError::InvalidExpiry(25)));
        assert_eq!(pool.record_new_order(1, 20, 20, 10), Err(TwammError::InvalidExpiry(20)));
        assert_eq!(pool.record_new_order(1, 10, 20, 10), Err(TwammError::InvalidExpiry(10)));
        assert_eq!(pool, OrderPool::new());
    }

    #[test]
    fn test_expire_is_idempotent() {
        let mut pool = OrderPool::new();
        pool.record_new_order(100, 20, 0, 10).unwrap();
        pool.record_new_order(40, 30, 0, 10).unwrap();

        assert_eq!(pool.expire_to_block(20).unwrap(), 100);
        assert_eq!(pool.current_sales_rate(), 40);
        let snapshot = pool.reward_factor_at(20);

        pool.distribute(1_000).unwrap();
        assert_eq!(pool.expire_to_block(20).unwrap(), 0);
        assert_eq!(pool.current_sales_rate(), 40);
        assert_eq!(pool.reward_factor_at(20), snapshot);

        // Nothing ends at 25
        assert_eq!(pool.expire_to_block(25).unwrap(), 0);
        assert_eq!(pool.reward_factor_at(25), None);
    }

    #[test]
    fn test_distribute_pro_rata() {
        let mut pool = OrderPool::new();
        let first = {
            pool.record_new_order(300, 20, 0, 10).unwrap();
            order(300, 0, 20, &pool)
        };
        let second = {
            pool.record_new_order(100, 20, 0, 10).unwrap();
            order(100, 0, 20, &pool)
        };

        assert_eq!(pool.distribute(4_000).unwrap(), 0);
        assert_eq!(pool.proceeds_of(&first, 5).unwrap(), 3_000);
        assert_eq!(pool.proceeds_of(&second, 5).unwrap(), 1_000);
    }

    #[test]
    fn test_distribute_without_sellers_returns_proceeds() {
        let mut pool = OrderPool::new();
        assert_eq!(pool.distribute(500).unwrap(), 500);
        assert_eq!(pool.reward_factor(), RewardFactor::ZERO);
        assert_eq!(pool.distribute(0).unwrap(), 0);
    }

    #[test]
    fn test_rounding_dust_stays_in_pool() {
        let mut pool = OrderPool::new();
        pool.record_new_order(3, 20, 0, 10).unwrap();
        let only = order(3, 0, 20, &pool);

        pool.distribute(10).unwrap();
        // 10 / 3 per unit, floored at Q64 resolution
        assert_eq!(pool.proceeds_of(&only, 1).unwrap(), 9);
    }

    #[test]
    fn test_expired_order_uses_snapshot() {
        let mut pool = OrderPool::new();
        pool.record_new_order(10, 20, 0, 10).unwrap();
        pool.record_new_order(10, 40, 0, 10).unwrap();
        let short = order(10, 0, 20, &pool);

        pool.distribute(200).unwrap();
        pool.expire_to_block(20).unwrap();
        // Only the long order is still selling
        pool.distribute(500).unwrap();

        assert_eq!(pool.proceeds_of(&short, 20).unwrap(), 100);
        assert_eq!(pool.proceeds_of(&short, 35).unwrap(), 100);

        // Before the expiry is executed the live factor applies
        let mut stale = pool.clone();
        stale.reward_factor_at_block.clear();
        assert_eq!(stale.proceeds_of(&short, 20), Err(TwammError::StaleVirtualState(20)));
    }

    #[test]
    fn test_remove_order_prevents_double_expiry() {
        let mut pool = OrderPool::new();
        pool.record_new_order(60, 20, 0, 10).unwrap();
        pool.record_new_order(40, 20, 0, 10).unwrap();

        pool.remove_order(60, 20).unwrap();
        assert_eq!(pool.current_sales_rate(), 40);
        assert_eq!(pool.sales_rate_ending_at(20), 40);

        assert_eq!(pool.expire_to_block(20).unwrap(), 40);
        assert_eq!(pool.current_sales_rate(), 0);

        // Removing more than is pending is an invariant violation
        assert_eq!(pool.remove_order(1, 20), Err(TwammError::MathUnderflow));
    }

    #[test]
    fn test_snapshot_released_with_last_order() {
        let mut pool = OrderPool::new();
        pool.record_new_order(5, 20, 0, 10).unwrap();
        pool.record_new_order(5, 20, 0, 10).unwrap();
        pool.expire_to_block(20).unwrap();
        assert!(pool.reward_factor_at(20).is_some());

        pool.release_expiry(20);
        assert!(pool.reward_factor_at(20).is_some());
        pool.release_expiry(20);
        assert!(pool.reward_factor_at(20).is_none());
    }
}
