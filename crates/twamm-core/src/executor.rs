//! # Virtual Order Executor
//!
//! Fast-forwards the reserves and both order pools to a target block.
//!
//! Execution walks the order-block grid: one step per interval boundary
//! crossed plus one for the partial interval ending at the target. Each step
//! trades the accumulated flows of both directions through the swap formula,
//! pays the proceeds into the pools, and only then expires orders ending at
//! that block. The number of steps depends on elapsed blocks and the interval,
//! never on how many orders are open.

use crate::errors::{CoreResult, TwammError};
use crate::math::safe_math::{safe_add_u128, safe_add_u64, safe_mul_u128};
use crate::order_pool::OrderPool;
use crate::swap_formula::virtual_trade;
use crate::types::{Reserves, TokenIndex};

/// Everything the executor mutates besides the reserves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualOrderState {
    /// Block up to which virtual orders have been executed
    pub last_virtual_order_block: u64,
    /// Orders selling token0
    pub pool0: OrderPool,
    /// Orders selling token1
    pub pool1: OrderPool,
}

impl VirtualOrderState {
    pub fn new(last_virtual_order_block: u64) -> Self {
        Self {
            last_virtual_order_block,
            ..Self::default()
        }
    }

    /// Pool of orders selling `token`
    pub fn pool(&self, token: TokenIndex) -> &OrderPool {
        match token {
            TokenIndex::Token0 => &self.pool0,
            TokenIndex::Token1 => &self.pool1,
        }
    }

    /// Mutable pool of orders selling `token`
    pub fn pool_mut(&mut self, token: TokenIndex) -> &mut OrderPool {
        match token {
            TokenIndex::Token0 => &mut self.pool0,
            TokenIndex::Token1 => &mut self.pool1,
        }
    }
}

/// Summary of one `advance_to` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionReport {
    pub from_block: u64,
    pub to_block: u64,
    /// Number of swap-formula steps taken
    pub steps: u64,
    /// Token0 sold by long-term orders
    pub token0_sold: u128,
    /// Token1 sold by long-term orders
    pub token1_sold: u128,
    /// Token0 paid out to token1 sellers
    pub token0_out: u128,
    /// Token1 paid out to token0 sellers
    pub token1_out: u128,
}

/// Execute virtual orders from `state.last_virtual_order_block` up to `target_block`.
///
/// A target at or before the last executed block is a no-op; state never
/// moves backwards.
pub fn advance_to(
    state: &mut VirtualOrderState,
    reserves: &mut Reserves,
    interval: u64,
    fee_bps: u16,
    target_block: u64,
) -> CoreResult<ExecutionReport> {
    let from_block = state.last_virtual_order_block;
    let mut report = ExecutionReport {
        from_block,
        to_block: from_block,
        ..ExecutionReport::default()
    };

    if target_block <= from_block {
        return Ok(report);
    }
    if interval == 0 {
        return Err(TwammError::invalid_config("order_block_interval must be greater than 0"));
    }

    let mut next_boundary = safe_add_u64(from_block - from_block % interval, interval)?;
    while next_boundary < target_block {
        step(state, reserves, fee_bps, next_boundary, &mut report)?;
        next_boundary = safe_add_u64(next_boundary, interval)?;
    }

    // Flush the partial interval up to the target
    if state.last_virtual_order_block < target_block {
        step(state, reserves, fee_bps, target_block, &mut report)?;
    }

    report.to_block = state.last_virtual_order_block;
    log::debug!(
        "Executed virtual orders {} -> {} in {} steps: sold {}/{}, paid out {}/{}",
        report.from_block,
        report.to_block,
        report.steps,
        report.token0_sold,
        report.token1_sold,
        report.token0_out,
        report.token1_out
    );

    Ok(report)
}

fn step(
    state: &mut VirtualOrderState,
    reserves: &mut Reserves,
    fee_bps: u16,
    block: u64,
    report: &mut ExecutionReport,
) -> CoreResult<()> {
    let elapsed = (block - state.last_virtual_order_block) as u128;
    let sell0 = safe_mul_u128(state.pool0.current_sales_rate(), elapsed)?;
    let sell1 = safe_mul_u128(state.pool1.current_sales_rate(), elapsed)?;

    let trade = virtual_trade(*reserves, sell0, sell1, fee_bps)?;
    let mut reserves_after = trade.reserves;

    // Proceeds of token0 sales are paid in token1 and vice versa
    let unpaid1 = state.pool0.distribute(trade.proceeds_for(TokenIndex::Token0))?;
    let unpaid0 = state.pool1.distribute(trade.proceeds_for(TokenIndex::Token1))?;
    reserves_after.reserve0 = safe_add_u128(reserves_after.reserve0, unpaid0)?;
    reserves_after.reserve1 = safe_add_u128(reserves_after.reserve1, unpaid1)?;

    // Orders ending here took part in this step's trade
    state.pool0.expire_to_block(block)?;
    state.pool1.expire_to_block(block)?;

    *reserves = reserves_after;
    state.last_virtual_order_block = block;

    report.steps += 1;
    report.token0_sold = safe_add_u128(report.token0_sold, sell0)?;
    report.token1_sold = safe_add_u128(report.token1_sold, sell1)?;
    report.token0_out = safe_add_u128(report.token0_out, trade.token0_out - unpaid0)?;
    report.token1_out = safe_add_u128(report.token1_out, trade.token1_out - unpaid1)?;

    log::trace!(
        "Step to block {}: sold {}/{}, reserves {}/{}",
        block,
        sell0,
        sell1,
        reserves.reserve0,
        reserves.reserve1
    );

    Ok(())
}
