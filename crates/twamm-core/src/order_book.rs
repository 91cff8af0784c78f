//! # Long-Term Order Book
//!
//! Owns both order pools, the per-order records and the execution cursor.
//!
//! Place, cancel and withdraw assume virtual orders have already been
//! executed up to the block they are called with; the pool facade does that
//! first. Each operation validates everything before it mutates anything.

use std::collections::BTreeMap;

use crate::errors::{CoreResult, TwammError};
use crate::executor::{advance_to, ExecutionReport, VirtualOrderState};
use crate::math::safe_math::{safe_add_u64, safe_mul_u128, safe_mul_u64, safe_sub_u64};
use crate::order_pool::OrderPool;
use crate::types::{
    CancelledOrder, LongTermOrder, OrderId, OrderState, Owner, PlacedOrder, Reserves, TokenIndex,
    WithdrawnProceeds,
};

/// Long-term orders of one pool
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct LongTermOrderBook {
    /// Block grid every expiry is aligned to
    order_block_interval: u64,
    /// Reserves-independent execution state
    virtual_state: VirtualOrderState,
    /// Every order ever placed, keyed by id
    orders: BTreeMap<OrderId, LongTermOrder>,
    next_order_id: OrderId,
}

impl LongTermOrderBook {
    pub fn new(order_block_interval: u64, genesis_block: u64) -> Self {
        Self {
            order_block_interval,
            virtual_state: VirtualOrderState::new(genesis_block),
            orders: BTreeMap::new(),
            next_order_id: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn order_block_interval(&self) -> u64 {
        self.order_block_interval
    }

    pub fn last_virtual_order_block(&self) -> u64 {
        self.virtual_state.last_virtual_order_block
    }

    pub fn virtual_state(&self) -> &VirtualOrderState {
        &self.virtual_state
    }

    /// Pool of orders selling `token`
    pub fn pool(&self, token: TokenIndex) -> &OrderPool {
        self.virtual_state.pool(token)
    }

    pub fn order(&self, id: OrderId) -> Option<&LongTermOrder> {
        self.orders.get(&id)
    }

    /// Orders placed by `owner`, in id order
    pub fn orders_of(&self, owner: Owner) -> impl Iterator<Item = &LongTermOrder> + '_ {
        self.orders.values().filter(move |order| order.owner == owner)
    }

    /// Proceeds `id` could withdraw at the last executed block
    pub fn claimable_proceeds(&self, id: OrderId) -> CoreResult<u128> {
        let order = self.orders.get(&id).ok_or(TwammError::OrderNotFound(id))?;
        if order.state != OrderState::Active {
            return Ok(0);
        }
        self.pool(order.sell_token)
            .proceeds_of(order, self.last_virtual_order_block())
    }

    /// Expiry for an order placed at `current_block` lasting `num_intervals`
    /// full intervals after the next grid boundary
    pub fn expiry_block_for(&self, current_block: u64, num_intervals: u64) -> CoreResult<u64> {
        let interval = self.order_block_interval;
        if interval == 0 {
            return Err(TwammError::invalid_config("order_block_interval must be greater than 0"));
        }
        let grid_start = current_block - current_block % interval;
        let span = safe_mul_u64(interval, safe_add_u64(num_intervals, 1)?)?;
        safe_add_u64(grid_start, span)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute virtual orders up to `target_block` against `reserves`
    pub fn execute_virtual_orders(
        &mut self,
        reserves: &mut Reserves,
        fee_bps: u16,
        target_block: u64,
    ) -> CoreResult<ExecutionReport> {
        advance_to(
            &mut self.virtual_state,
            reserves,
            self.order_block_interval,
            fee_bps,
            target_block,
        )
    }

    pub(crate) fn restore_virtual_state(&mut self, state: VirtualOrderState) {
        self.virtual_state = state;
    }

    fn ensure_current(&self, current_block: u64) -> CoreResult<()> {
        if self.last_virtual_order_block() != current_block {
            return Err(TwammError::StaleVirtualState(current_block));
        }
        Ok(())
    }

    fn owned_active_order(&self, owner: Owner, id: OrderId) -> CoreResult<&LongTermOrder> {
        let order = self.orders.get(&id).ok_or(TwammError::OrderNotFound(id))?;
        if order.owner != owner {
            return Err(TwammError::NotOrderOwner);
        }
        if order.state != OrderState::Active {
            return Err(TwammError::OrderNotActive);
        }
        Ok(order)
    }

    // ========================================================================
    // Order Operations
    // ========================================================================

    /// Place an order selling `amount` of `sell_token` over `num_intervals`
    /// full intervals plus the remainder of the current one
    pub fn place_order(
        &mut self,
        owner: Owner,
        sell_token: TokenIndex,
        amount: u128,
        num_intervals: u64,
        current_block: u64,
    ) -> CoreResult<PlacedOrder> {
        if amount == 0 {
            return Err(TwammError::InvalidAmount);
        }
        if num_intervals == 0 {
            return Err(TwammError::InvalidIntervals);
        }
        self.ensure_current(current_block)?;

        let expiry_block = self.expiry_block_for(current_block, num_intervals)?;
        let blocks = safe_sub_u64(expiry_block, current_block)? as u128;
        let sales_rate = amount / blocks;
        if sales_rate == 0 {
            return Err(TwammError::ZeroSalesRate);
        }
        let amount_in = safe_mul_u128(sales_rate, blocks)?;

        let interval = self.order_block_interval;
        let pool = self.virtual_state.pool_mut(sell_token);
        pool.record_new_order(sales_rate, expiry_block, current_block, interval)?;
        let reward_factor_at_submission = pool.reward_factor();

        let id = self.next_order_id;
        self.next_order_id += 1;
        self.orders.insert(
            id,
            LongTermOrder {
                id,
                owner,
                sell_token,
                sales_rate,
                start_block: current_block,
                expiry_block,
                reward_factor_at_submission,
                state: OrderState::Active,
            },
        );

        log::info!(
            "Placed order {} for {}: selling {} of {:?} at {}/block until block {}",
            id,
            owner,
            amount_in,
            sell_token,
            sales_rate,
            expiry_block
        );

        Ok(PlacedOrder {
            id,
            sales_rate,
            expiry_block,
            amount_in,
        })
    }

    /// Cancel an active order, refunding the unsold principal and paying the
    /// proceeds accrued so far.
    ///
    /// At or after expiry nothing is left to refund and the cancel settles the
    /// remaining proceeds like a terminal withdrawal.
    pub fn cancel_order(
        &mut self,
        owner: Owner,
        id: OrderId,
        current_block: u64,
    ) -> CoreResult<CancelledOrder> {
        self.ensure_current(current_block)?;
        let order = self.owned_active_order(owner, id)?.clone();

        let (sell_token, sales_rate, expiry_block) =
            (order.sell_token, order.sales_rate, order.expiry_block);
        let remaining_blocks = expiry_block.saturating_sub(current_block);
        let refund = safe_mul_u128(sales_rate, remaining_blocks as u128)?;

        let pool = self.virtual_state.pool_mut(sell_token);
        let proceeds = pool.proceeds_of(&order, current_block)?;
        if remaining_blocks == 0 {
            // Expiry already dropped the rate
            pool.release_expiry(expiry_block);
        } else {
            pool.remove_order(sales_rate, expiry_block)?;
        }

        if let Some(order) = self.orders.get_mut(&id) {
            order.state = OrderState::Cancelled;
        }

        log::info!(
            "Cancelled order {}: refund {} of {:?}, proceeds {}",
            id,
            refund,
            sell_token,
            proceeds
        );

        Ok(CancelledOrder { refund, proceeds })
    }

    /// Withdraw accrued proceeds. After expiry this is the final withdrawal
    /// and completes the order, even when nothing is left to claim.
    pub fn withdraw_proceeds(
        &mut self,
        owner: Owner,
        id: OrderId,
        current_block: u64,
    ) -> CoreResult<WithdrawnProceeds> {
        self.ensure_current(current_block)?;
        let order = self.owned_active_order(owner, id)?;

        let pool = self.virtual_state.pool(order.sell_token);
        let settled = pool.settled_factor(order, current_block)?;
        let proceeds = settled.proceeds_since(order.reward_factor_at_submission, order.sales_rate)?;
        let completed = order.is_expired(current_block);
        if proceeds == 0 && !completed {
            return Err(TwammError::NothingToWithdraw);
        }

        let (sell_token, expiry_block) = (order.sell_token, order.expiry_block);
        if completed {
            self.virtual_state.pool_mut(sell_token).release_expiry(expiry_block);
        }

        if let Some(order) = self.orders.get_mut(&id) {
            order.reward_factor_at_submission = settled;
            if completed {
                order.state = OrderState::Completed;
            }
        }

        if completed {
            log::info!("Order {} completed with final proceeds {}", id, proceeds);
        } else {
            log::info!("Withdrew {} proceeds from order {}", proceeds, id);
        }

        Ok(WithdrawnProceeds { proceeds, completed })
    }
}
