//! Concentrated-liquidity quoting.
//!
//! Two tiers: an in-range fast path that prices entirely against the active
//! liquidity when the swap stays inside the current tick range, and a full
//! simulation that walks initialized ticks when it does not. Pool selection
//! across fee tiers and the connector-hop variant both build on these.

use ethers::types::{Address, U256};
use tracing::trace;

use crate::math::v3::{
    compute_swap_step, get_sqrt_ratio_at_tick, MAX_SQRT_RATIO, MIN_SQRT_RATIO,
};
use crate::pools::UniswapV3Pool;
use crate::registry::PoolRegistry;

/// Cap on crossed ticks per simulation; beyond this the pool is effectively
/// drained for the requested size.
const MAX_TICK_CROSSINGS: usize = 256;

/// Next initialized tick strictly in the swap direction, if any.
fn next_initialized_tick(pool: &UniswapV3Pool, current: i32, zero_for_one: bool) -> Option<i32> {
    if zero_for_one {
        pool.ticks
            .iter()
            .rev()
            .map(|t| t.tick)
            .find(|t| *t <= current)
    } else {
        pool.ticks.iter().map(|t| t.tick).find(|t| *t > current)
    }
}

fn liquidity_net_at(pool: &UniswapV3Pool, tick: i32) -> i128 {
    pool.ticks
        .iter()
        .find(|t| t.tick == tick)
        .map(|t| t.liquidity_net)
        .unwrap_or(0)
}

/// Fast path: price the swap against active liquidity only. Returns `None`
/// when the input would push the price across the nearest initialized tick,
/// in which case the caller must simulate.
pub fn check_in_range_liquidity(
    pool: &UniswapV3Pool,
    token_in: Address,
    amount_in: U256,
) -> Option<U256> {
    if pool.liquidity == 0 || pool.sqrt_price_x96.is_zero() {
        return None;
    }
    let zero_for_one = token_in == pool.token0;
    let boundary = next_initialized_tick(pool, pool.tick, zero_for_one);
    let target = match boundary {
        Some(tick) => get_sqrt_ratio_at_tick(tick),
        None if zero_for_one => MIN_SQRT_RATIO + U256::one(),
        None => MAX_SQRT_RATIO - U256::one(),
    };

    let (_, amount_out, sqrt_after, _) = compute_swap_step(
        pool.sqrt_price_x96,
        target,
        pool.liquidity,
        amount_in,
        pool.fee,
    );
    if sqrt_after == target {
        // boundary reached; the active range cannot absorb the full input
        return None;
    }
    Some(amount_out)
}

/// Full swap simulation walking the initialized-tick list, applying each
/// crossed tick's net liquidity. Mirrors the pool contract's swap loop for
/// exact input.
pub fn simulate_swap(pool: &UniswapV3Pool, token_in: Address, amount_in: U256) -> U256 {
    if pool.sqrt_price_x96.is_zero() || amount_in.is_zero() {
        return U256::zero();
    }
    let zero_for_one = token_in == pool.token0;
    let price_limit = if zero_for_one {
        MIN_SQRT_RATIO + U256::one()
    } else {
        MAX_SQRT_RATIO - U256::one()
    };

    let mut sqrt_price = pool.sqrt_price_x96;
    let mut liquidity = pool.liquidity;
    let mut tick = pool.tick;
    let mut remaining = amount_in;
    let mut total_out = U256::zero();

    for _ in 0..MAX_TICK_CROSSINGS {
        if remaining.is_zero() || sqrt_price == price_limit {
            break;
        }
        let boundary = next_initialized_tick(pool, tick, zero_for_one);
        let target = match boundary {
            Some(t) => {
                let ratio = get_sqrt_ratio_at_tick(t);
                if zero_for_one {
                    ratio.max(price_limit)
                } else {
                    ratio.min(price_limit)
                }
            }
            None => price_limit,
        };

        let (step_in, step_out, sqrt_after, fee) =
            compute_swap_step(sqrt_price, target, liquidity, remaining, pool.fee);
        remaining = remaining.saturating_sub(step_in + fee);
        total_out += step_out;
        sqrt_price = sqrt_after;

        if sqrt_price != target {
            break;
        }
        match boundary {
            Some(boundary_tick) => {
                // crossing: fold in the boundary's net liquidity
                let net = liquidity_net_at(pool, boundary_tick);
                let delta = if zero_for_one { -net } else { net };
                liquidity = apply_liquidity_delta(liquidity, delta);
                tick = if zero_for_one {
                    boundary_tick - 1
                } else {
                    boundary_tick
                };
                if liquidity == 0 && next_initialized_tick(pool, tick, zero_for_one).is_none() {
                    break;
                }
            }
            None => break,
        }
    }

    trace!(
        address = ?pool.address,
        fee = pool.fee,
        %amount_in,
        %total_out,
        "v3 swap simulation"
    );
    total_out
}

fn apply_liquidity_delta(liquidity: u128, delta: i128) -> u128 {
    if delta >= 0 {
        liquidity.saturating_add(delta as u128)
    } else {
        liquidity.saturating_sub(delta.unsigned_abs())
    }
}

/// Quote one pool: fast path when the swap stays in range, simulation
/// otherwise.
pub fn quote_pool(pool: &UniswapV3Pool, token_in: Address, amount_in: U256) -> U256 {
    match check_in_range_liquidity(pool, token_in, amount_in) {
        Some(amount_out) => amount_out,
        None => simulate_swap(pool, token_in, amount_in),
    }
}

/// Quote the single pool at an exact fee tier, zero when that tier is not
/// registered for the pair. Settlement uses this to re-price a route at the
/// tier frozen into its quote.
pub fn quote_tier(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
    fee: u32,
) -> U256 {
    registry
        .uniswap_v3_pools(token_in, token_out)
        .iter()
        .find(|pool| pool.fee == fee)
        .map(|pool| quote_pool(pool, token_in, amount_in))
        .unwrap_or_default()
}

/// Best quote across every fee tier registered for the pair, returning the
/// winning `(amount_out, fee)`. Strict comparison keeps the lowest tier on
/// ties; a full miss returns `(0, 0)`.
pub fn sort_pools(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> (U256, u32) {
    let mut best = (U256::zero(), 0u32);
    for pool in registry.uniswap_v3_pools(token_in, token_out) {
        let amount_out = quote_pool(pool, token_in, amount_in);
        if amount_out > best.0 {
            best = (amount_out, pool.fee);
        }
    }
    best
}

/// Two-leg quote through the configured connector token. A zero quote on
/// either leg zeroes the whole route.
pub fn quote_with_connector(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> (U256, [u32; 2]) {
    let connector = registry.connector();
    if token_in == connector || token_out == connector {
        return (U256::zero(), [0, 0]);
    }
    let (leg_one, fee_one) = sort_pools(registry, token_in, connector, amount_in);
    if leg_one.is_zero() {
        return (U256::zero(), [0, 0]);
    }
    let (leg_two, fee_two) = sort_pools(registry, connector, token_out, leg_one);
    if leg_two.is_zero() {
        return (U256::zero(), [0, 0]);
    }
    (leg_two, [fee_one, fee_two])
}
