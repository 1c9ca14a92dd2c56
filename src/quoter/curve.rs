//! Curve StableSwap quoting. Direct pools only; the bonding curve is priced
//! through the registered pool covering the pair, no connector variant.

use ethers::types::{Address, U256};
use tracing::trace;

use crate::math::curve;
use crate::registry::PoolRegistry;

pub fn quote(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> U256 {
    let pool = match registry.curve_pool(token_in, token_out) {
        Some(pool) => pool,
        None => return U256::zero(),
    };
    let i = match pool.tokens.iter().position(|t| *t == token_in) {
        Some(i) => i,
        None => return U256::zero(),
    };
    let j = match pool.tokens.iter().position(|t| *t == token_out) {
        Some(j) => j,
        None => return U256::zero(),
    };
    let amount_out = curve::get_dy(
        i,
        j,
        amount_in,
        &pool.balances,
        &pool.rates,
        pool.amplification,
        pool.fee,
    );
    trace!(?token_in, ?token_out, %amount_out, "curve quote");
    amount_out
}
