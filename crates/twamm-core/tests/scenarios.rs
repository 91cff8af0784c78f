//! # Pool Scenarios
//!
//! End-to-end runs through the pool facade: opposing orders, a lone seller
//! compared with a single swap, and cancellation mid-order.

use twamm_core::math::sqrt_u256;
use twamm_core::swap_formula::one_sided_out;
use twamm_core::*;

const R: u128 = 100_000_000;
const ALICE: Owner = Owner::new([0xA1; 32]);
const BOB: Owner = Owner::new([0xB0; 32]);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn funded_pool(reserve0: u128, reserve1: u128, fee_bps: u16) -> TwammPool {
    let config = PoolConfig::new(DEFAULT_ORDER_BLOCK_INTERVAL, fee_bps).unwrap();
    let mut pool = TwammPool::new(config, 0).unwrap();
    pool.mint(reserve0, reserve1, 0).unwrap();
    pool
}

#[test]
fn test_opposing_orders_cancel_out() {
    init_logging();
    let mut pool = funded_pool(R, R, 0);

    let alice = pool.place_long_term_order(ALICE, TokenIndex::Token0, 10_000, 9, 0).unwrap();
    let bob = pool.place_long_term_order(BOB, TokenIndex::Token1, 10_000, 9, 0).unwrap();
    assert_eq!(alice.expiry_block, 100);
    assert_eq!(alice.sales_rate, 100);
    assert_eq!(bob.sales_rate, 100);

    let report = pool.execute_virtual_orders(100).unwrap();
    assert_eq!(report.steps, 10);
    assert_eq!(report.token0_sold, 10_000);
    assert_eq!(report.token1_sold, 10_000);

    // Equal flows meet entirely inside the pool
    assert_eq!(pool.reserves(), Reserves::new(R, R));

    let alice_out = pool.withdraw_proceeds(ALICE, alice.id, 100).unwrap();
    let bob_out = pool.withdraw_proceeds(BOB, bob.id, 100).unwrap();
    assert!(alice_out.completed && bob_out.completed);
    assert_eq!(alice_out.proceeds, bob.amount_in);
    assert_eq!(bob_out.proceeds, alice.amount_in);
}

#[test]
fn test_lone_seller_tracks_single_swap() {
    init_logging();
    let mut pool = funded_pool(R, R, 0);
    let placed = pool.place_long_term_order(ALICE, TokenIndex::Token0, 10_000, 9, 0).unwrap();
    assert_eq!(placed.amount_in, 10_000);

    let report = pool.execute_virtual_orders(100).unwrap();
    assert_eq!(report.steps, 10);

    let single = one_sided_out(R, R, 10_000).unwrap();
    assert_eq!(single, 9_999);

    // Each step rounds its output down, never above the one-shot swap
    let withdrawn = pool.withdraw_proceeds(ALICE, placed.id, 100).unwrap();
    assert!(withdrawn.completed);
    assert!(withdrawn.proceeds <= single);
    assert!(withdrawn.proceeds + 2 * report.steps as u128 >= single);
    assert!(withdrawn.proceeds <= report.token1_out);
}

#[test]
fn test_spread_order_beats_one_swap_with_arbitrage() {
    init_logging();
    let reserve = 1_000_000;
    let mut pool = funded_pool(reserve, reserve, 0);
    let placed = pool.place_long_term_order(ALICE, TokenIndex::Token0, 100_000, 9, 0).unwrap();
    assert_eq!(placed.sales_rate, 1_000);

    for block in (10..=100).step_by(10) {
        pool.execute_virtual_orders(block).unwrap();

        // Arbitrageur pulls the price back to 1:1
        let reserves = pool.reserves();
        let balanced = sqrt_u256(reserves.product()).as_u128();
        if balanced > reserves.reserve1 {
            pool.swap(TokenIndex::Token1, balanced - reserves.reserve1, 0, block).unwrap();
        }
    }

    let spread = pool.withdraw_proceeds(ALICE, placed.id, 100).unwrap().proceeds;
    let one_shot = one_sided_out(reserve, reserve, 100_000).unwrap();
    assert_eq!(one_shot, 90_909);
    assert!(spread > 98_000, "spread order got {}", spread);
    assert!(spread > one_shot);
}

#[test]
fn test_cancel_midway_refunds_unsold() {
    init_logging();
    let mut pool = funded_pool(R, R, 0);

    pool.execute_virtual_orders(5).unwrap();
    let placed = pool.place_long_term_order(ALICE, TokenIndex::Token0, 19_500, 19, 5).unwrap();
    assert_eq!(placed.expiry_block, 200);
    assert_eq!(placed.sales_rate, 100);
    assert_eq!(placed.amount_in, 19_500);

    let report = pool.execute_virtual_orders(105).unwrap();
    let cancelled = pool.cancel_long_term_order(ALICE, placed.id, 105).unwrap();

    assert_eq!(cancelled.refund, 100 * 95);
    assert_eq!(cancelled.refund + report.token0_sold, placed.amount_in);
    assert!(cancelled.proceeds <= report.token1_out);
    assert!(cancelled.proceeds + 1 >= report.token1_out);

    // Nothing sells after the cancel
    let after = pool.execute_virtual_orders(300).unwrap();
    assert_eq!(after.token0_sold, 0);
    assert_eq!(pool.order_book().pool(TokenIndex::Token0).current_sales_rate(), 0);
    assert_eq!(
        pool.withdraw_proceeds(ALICE, placed.id, 300),
        Err(TwammError::OrderNotActive)
    );
}

#[test]
fn test_reserves_account_for_every_sale() {
    init_logging();
    let mut pool = funded_pool(R, 2 * R, 30);

    pool.place_long_term_order(ALICE, TokenIndex::Token0, 50_000, 4, 0).unwrap();
    pool.place_long_term_order(BOB, TokenIndex::Token1, 80_000, 7, 0).unwrap();
    pool.place_long_term_order(BOB, TokenIndex::Token0, 7_000, 2, 0).unwrap();

    let mut block = 0;
    for target in [13, 27, 40, 41, 66, 95, 120] {
        let before = pool.reserves();
        let report = pool.execute_virtual_orders(target).unwrap();
        let after = pool.reserves();

        assert_eq!(report.from_block, block);
        assert_eq!(report.to_block, target);
        assert_eq!(after.reserve0, before.reserve0 + report.token0_sold - report.token0_out);
        assert_eq!(after.reserve1, before.reserve1 + report.token1_sold - report.token1_out);
        assert!(after.product() >= before.product());
        block = target;
    }
}

#[test]
fn test_one_direction_never_strands_proceeds() {
    init_logging();
    let mut pool = funded_pool(R, R, 30);
    let placed = pool.place_long_term_order(BOB, TokenIndex::Token1, 40_000, 3, 0).unwrap();

    let report = pool.execute_virtual_orders(80).unwrap();
    // No token0 sellers, so no token1 ever leaves for them
    assert_eq!(report.token1_out, 0);
    assert_eq!(pool.reserves().reserve1, R + placed.amount_in);
    assert_eq!(pool.reserves().reserve0, R - report.token0_out);
    assert_eq!(pool.order_book().pool(TokenIndex::Token0).reward_factor(), RewardFactor::ZERO);
}

#[test]
fn test_swap_sees_executed_reserves() {
    init_logging();
    let mut pool = funded_pool(R, R, 0);
    pool.place_long_term_order(ALICE, TokenIndex::Token0, 1_000_000, 9, 0).unwrap();

    let quoted = pool.quote_reserves(50).unwrap();
    let result = pool.swap(TokenIndex::Token1, 10_000, 0, 50).unwrap();

    let expected = one_sided_out(quoted.reserve1, quoted.reserve0, 10_000).unwrap();
    assert_eq!(result.amount_out, expected);
    assert_eq!(pool.last_virtual_order_block(), 50);
}
