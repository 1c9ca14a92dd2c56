//! Balancer V2 quoting: weighted and stable pools, each priced two ways.
//!
//! The simulated mode replays the vault's integer fixed-point swap path and
//! is what routing uses. The analytical mode evaluates the same pool
//! equation in floating point; the two must agree to within 1e-6 relative,
//! which doubles as a standing cross-check on both implementations.

use ethers::types::{Address, U256};
use tracing::{trace, warn};

use crate::errors::PricerError;
use crate::math::balancer::{
    bmul, calc_out_given_in_weighted, calculate_invariant, get_token_balance_given_invariant,
    AMP_PRECISION, BONE,
};
use crate::pools::{BalancerStablePool, BalancerWeightedPool, Pool};
use crate::registry::{PoolRegistry, NONEXISTENT_POOL_ID};

fn token_index(tokens: &[Address], token: Address) -> Option<usize> {
    tokens.iter().position(|t| *t == token)
}

fn upscale(amount: U256, decimals: u8) -> U256 {
    if decimals <= 18 {
        amount * U256::exp10((18 - decimals) as usize)
    } else {
        amount / U256::exp10((decimals - 18) as usize)
    }
}

fn downscale(amount: U256, decimals: u8) -> U256 {
    if decimals <= 18 {
        amount / U256::exp10((18 - decimals) as usize)
    } else {
        amount * U256::exp10((decimals - 18) as usize)
    }
}

// Lossy scientific conversion: first 18 digits as mantissa, rest as a
// base-10 exponent.
fn u256_to_f64(v: U256) -> f64 {
    if v.is_zero() {
        return 0.0;
    }
    let s = v.to_string();
    let take = s.len().min(18);
    let (mantissa, _) = s.split_at(take);
    let mantissa = mantissa.parse::<f64>().unwrap_or(0.0);
    mantissa * 10f64.powi((s.len() - take) as i32)
}

fn f64_to_u256(v: f64) -> U256 {
    if !v.is_finite() || v <= 0.0 {
        return U256::zero();
    }
    U256::from_dec_str(&format!("{:.0}", v)).unwrap_or_else(|_| U256::zero())
}

/// Integer fixed-point replay of a single-pool swap, the canonical quote.
/// Tokens must both be pool members.
pub fn quote_within_pool_simulated(
    pool: &Pool,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> Result<U256, PricerError> {
    match pool {
        Pool::BalancerWeighted(p) => weighted_simulated(p, token_in, token_out, amount_in),
        Pool::BalancerStable(p) => stable_simulated(p, token_in, token_out, amount_in),
        _ => Ok(U256::zero()),
    }
}

/// Floating-point evaluation of the same pool equation.
pub fn quote_within_pool_analytical(
    pool: &Pool,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> Result<U256, PricerError> {
    match pool {
        Pool::BalancerWeighted(p) => weighted_analytical(p, token_in, token_out, amount_in),
        Pool::BalancerStable(p) => stable_analytical(p, token_in, token_out, amount_in),
        _ => Ok(U256::zero()),
    }
}

fn member_indices(
    pool_id: [u8; 32],
    tokens: &[Address],
    token_in: Address,
    token_out: Address,
) -> Result<(usize, usize), PricerError> {
    let i = token_index(tokens, token_in).ok_or(PricerError::UnsupportedTokenIn {
        pool_id,
        token: token_in,
    })?;
    let j = token_index(tokens, token_out).ok_or(PricerError::UnsupportedTokenOut {
        pool_id,
        token: token_out,
    })?;
    Ok((i, j))
}

fn weighted_simulated(
    pool: &BalancerWeightedPool,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> Result<U256, PricerError> {
    let (i, j) = member_indices(pool.pool_id, &pool.tokens, token_in, token_out)?;
    let scaled_in = upscale(amount_in, pool.decimals[i]);
    let out = calc_out_given_in_weighted(
        upscale(pool.balances[i], pool.decimals[i]),
        pool.weights[i],
        upscale(pool.balances[j], pool.decimals[j]),
        pool.weights[j],
        scaled_in,
        pool.swap_fee,
    );
    Ok(downscale(out, pool.decimals[j]))
}

fn weighted_analytical(
    pool: &BalancerWeightedPool,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> Result<U256, PricerError> {
    let (i, j) = member_indices(pool.pool_id, &pool.tokens, token_in, token_out)?;
    let balance_in = u256_to_f64(upscale(pool.balances[i], pool.decimals[i]));
    let balance_out = u256_to_f64(upscale(pool.balances[j], pool.decimals[j]));
    let weight_in = u256_to_f64(pool.weights[i]);
    let weight_out = u256_to_f64(pool.weights[j]);
    if balance_in <= 0.0 || balance_out <= 0.0 || weight_out <= 0.0 {
        return Ok(U256::zero());
    }
    let fee = u256_to_f64(pool.swap_fee) / 1e18;
    let adjusted_in = u256_to_f64(upscale(amount_in, pool.decimals[i])) * (1.0 - fee);

    let base = balance_in / (balance_in + adjusted_in);
    let out = balance_out * (1.0 - base.powf(weight_in / weight_out));
    Ok(downscale(f64_to_u256(out), pool.decimals[j]))
}

fn stable_simulated(
    pool: &BalancerStablePool,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> Result<U256, PricerError> {
    let (i, j) = member_indices(pool.pool_id, &pool.tokens, token_in, token_out)?;
    if pool.swap_fee >= BONE {
        return Ok(U256::zero());
    }
    let balances: Vec<U256> = pool
        .balances
        .iter()
        .zip(&pool.decimals)
        .map(|(b, d)| upscale(*b, *d))
        .collect();
    if balances.iter().any(|b| b.is_zero()) {
        return Ok(U256::zero());
    }
    let d = calculate_invariant(pool.amplification, &balances);
    if d.is_zero() {
        return Ok(U256::zero());
    }
    // vault takes the fee off the input before invariant math
    let scaled_in = bmul(upscale(amount_in, pool.decimals[i]), BONE - pool.swap_fee);
    let mut bumped = balances.clone();
    bumped[i] += scaled_in;
    let y = get_token_balance_given_invariant(pool.amplification, &bumped, d, j);
    let out = balances[j].saturating_sub(y).saturating_sub(U256::one());
    Ok(downscale(out, pool.decimals[j]))
}

fn stable_analytical(
    pool: &BalancerStablePool,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> Result<U256, PricerError> {
    let (i, j) = member_indices(pool.pool_id, &pool.tokens, token_in, token_out)?;
    let balances: Vec<f64> = pool
        .balances
        .iter()
        .zip(&pool.decimals)
        .map(|(b, d)| u256_to_f64(upscale(*b, *d)))
        .collect();
    if balances.iter().any(|b| *b <= 0.0) {
        return Ok(U256::zero());
    }
    let amp = u256_to_f64(pool.amplification) / AMP_PRECISION as f64;
    let d = stable_invariant_f64(amp, &balances);
    let fee = u256_to_f64(pool.swap_fee) / 1e18;
    let scaled_in = u256_to_f64(upscale(amount_in, pool.decimals[i])) * (1.0 - fee);

    let mut bumped = balances.clone();
    bumped[i] += scaled_in;
    let y = stable_out_balance_f64(amp, &bumped, d, j);
    let out = (balances[j] - y).max(0.0);
    Ok(downscale(f64_to_u256(out), pool.decimals[j]))
}

fn stable_invariant_f64(amp: f64, balances: &[f64]) -> f64 {
    let n = balances.len() as f64;
    let sum: f64 = balances.iter().sum();
    if sum == 0.0 {
        return 0.0;
    }
    let ann = amp * n;
    let mut d = sum;
    for _ in 0..255 {
        let mut d_p = d;
        for x in balances {
            d_p = d_p * d / (x * n);
        }
        let prev = d;
        d = (ann * sum + d_p * n) * d / ((ann - 1.0) * d + (n + 1.0) * d_p);
        if (d - prev).abs() < 1e-10 * d {
            break;
        }
    }
    d
}

fn stable_out_balance_f64(amp: f64, balances: &[f64], d: f64, index_out: usize) -> f64 {
    let n = balances.len() as f64;
    let ann = amp * n;
    let mut c = d;
    let mut sum = 0.0;
    for (k, x) in balances.iter().enumerate() {
        if k == index_out {
            continue;
        }
        sum += x;
        c = c * d / (x * n);
    }
    c = c * d / (ann * n);
    let b = sum + d / ann;
    let mut y = d;
    for _ in 0..255 {
        let prev = y;
        y = (y * y + c) / (2.0 * y + b - d);
        if (y - prev).abs() < 1e-10 * y {
            break;
        }
    }
    y
}

fn quote_pair(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
    want_stable: bool,
) -> U256 {
    let pool_id = registry.balancer_pool_id(token_in, token_out);
    if pool_id == NONEXISTENT_POOL_ID {
        return U256::zero();
    }
    let pool = match registry.balancer_pool(pool_id) {
        Ok(pool) => pool,
        Err(err) => {
            warn!(%err, "balancer pair index points at missing pool");
            return U256::zero();
        }
    };
    let is_stable = matches!(pool, Pool::BalancerStable(_));
    if is_stable != want_stable {
        return U256::zero();
    }
    match quote_within_pool_simulated(pool, token_in, token_out, amount_in) {
        Ok(amount_out) => {
            trace!(?token_in, ?token_out, %amount_out, stable = is_stable, "balancer quote");
            amount_out
        }
        Err(err) => {
            warn!(%err, "balancer pair quote failed");
            U256::zero()
        }
    }
}

/// Direct weighted-pool quote from the pair index.
pub fn quote_weighted(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> U256 {
    quote_pair(registry, token_in, token_out, amount_in, false)
}

/// Direct stable-pool quote from the pair index.
pub fn quote_stable(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> U256 {
    quote_pair(registry, token_in, token_out, amount_in, true)
}

/// Multi-hop swap through an explicit pool-id list. `path` has one more
/// entry than `pool_ids`; each leg's tokens must be members of its pool.
/// A zero leg zeroes the whole batch.
pub fn quote_batch(
    registry: &PoolRegistry,
    pool_ids: &[[u8; 32]],
    path: &[Address],
    amount_in: U256,
) -> Result<U256, PricerError> {
    if pool_ids.is_empty() || path.len() != pool_ids.len() + 1 {
        return Ok(U256::zero());
    }
    let mut amount = amount_in;
    for (leg, pool_id) in pool_ids.iter().enumerate() {
        let pool = registry.balancer_pool(*pool_id)?;
        amount = quote_within_pool_simulated(pool, path[leg], path[leg + 1], amount)?;
        if amount.is_zero() {
            return Ok(U256::zero());
        }
    }
    Ok(amount)
}

/// Two-leg quote through the configured connector, either pool flavor per
/// leg. Returns the output with the pool id serving each leg so the route
/// can settle through them; zero on either leg propagates.
pub fn quote_with_connector(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> (U256, [[u8; 32]; 2]) {
    let connector = registry.connector();
    if token_in == connector || token_out == connector {
        return (U256::zero(), [NONEXISTENT_POOL_ID; 2]);
    }
    let (leg_one, first) = quote_any(registry, token_in, connector, amount_in);
    if leg_one.is_zero() {
        return (U256::zero(), [NONEXISTENT_POOL_ID; 2]);
    }
    let (leg_two, second) = quote_any(registry, connector, token_out, leg_one);
    if leg_two.is_zero() {
        return (U256::zero(), [NONEXISTENT_POOL_ID; 2]);
    }
    (leg_two, [first, second])
}

// Quote whichever pool flavor the pair index resolves to, reporting the
// pool id that served it.
fn quote_any(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> (U256, [u8; 32]) {
    let pool_id = registry.balancer_pool_id(token_in, token_out);
    if pool_id == NONEXISTENT_POOL_ID {
        return (U256::zero(), NONEXISTENT_POOL_ID);
    }
    let pool = match registry.balancer_pool(pool_id) {
        Ok(pool) => pool,
        Err(err) => {
            warn!(%err, "balancer pair index points at missing pool");
            return (U256::zero(), NONEXISTENT_POOL_ID);
        }
    };
    match quote_within_pool_simulated(pool, token_in, token_out, amount_in) {
        Ok(amount_out) => (amount_out, pool_id),
        Err(err) => {
            warn!(%err, "balancer connector leg failed");
            (U256::zero(), NONEXISTENT_POOL_ID)
        }
    }
}
