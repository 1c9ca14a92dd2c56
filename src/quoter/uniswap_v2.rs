//! Constant-product quoting for Uniswap V2 and SushiSwap. Both share the
//! same formula; they differ only in which registry table holds the pool.

use ethers::types::{Address, U256};
use tracing::trace;

use crate::math::v2;
use crate::pools::UniswapV2Pool;
use crate::registry::PoolRegistry;

fn quote_pool(pool: &UniswapV2Pool, token_in: Address, amount_in: U256) -> U256 {
    let (reserve_in, reserve_out) = if token_in == pool.token0 {
        (pool.reserve0, pool.reserve1)
    } else {
        (pool.reserve1, pool.reserve0)
    };
    v2::get_amount_out(
        amount_in,
        U256::from(reserve_in),
        U256::from(reserve_out),
        pool.fee_bps,
    )
}

pub fn quote_uniswap(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> U256 {
    match registry.uniswap_v2_pool(token_in, token_out) {
        Some(pool) => {
            let amount_out = quote_pool(pool, token_in, amount_in);
            trace!(?token_in, ?token_out, %amount_out, "uniswap v2 quote");
            amount_out
        }
        None => U256::zero(),
    }
}

pub fn quote_sushiswap(
    registry: &PoolRegistry,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
) -> U256 {
    match registry.sushiswap_pool(token_in, token_out) {
        Some(pool) => {
            let amount_out = quote_pool(pool, token_in, amount_in);
            trace!(?token_in, ?token_out, %amount_out, "sushiswap quote");
            amount_out
        }
        None => U256::zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PricerSettings;

    fn addr(b: u8) -> Address {
        Address::from([b; 20])
    }

    fn registry_with_pool() -> PoolRegistry {
        let mut reg = PoolRegistry::new(&PricerSettings::default());
        reg.add_uniswap_v2(UniswapV2Pool {
            address: addr(1),
            token0: addr(2),
            token1: addr(3),
            reserve0: 1_000 * 10u128.pow(18),
            reserve1: 1_800_000 * 10u128.pow(18),
            fee_bps: 30,
        });
        reg
    }

    #[test]
    fn quotes_match_the_closed_form() {
        let reg = registry_with_pool();
        let amount_in = U256::exp10(18);
        let out = quote_uniswap(&reg, addr(2), addr(3), amount_in);

        let r_in = U256::from(1_000u64) * U256::exp10(18);
        let r_out = U256::from(1_800_000u64) * U256::exp10(18);
        let expected = amount_in * U256::from(997u64) * r_out
            / (r_in * U256::from(1000u64) + amount_in * U256::from(997u64));
        assert_eq!(out, expected);
    }

    #[test]
    fn direction_flips_the_reserves() {
        let reg = registry_with_pool();
        let forward = quote_uniswap(&reg, addr(2), addr(3), U256::exp10(18));
        let backward = quote_uniswap(&reg, addr(3), addr(2), U256::exp10(18));
        // selling the scarce token yields far more than selling the plentiful one
        assert!(forward > backward * U256::from(1_000u64));
    }

    #[test]
    fn missing_pool_quotes_zero() {
        let reg = registry_with_pool();
        assert!(quote_uniswap(&reg, addr(2), addr(9), U256::exp10(18)).is_zero());
        assert!(quote_sushiswap(&reg, addr(2), addr(3), U256::exp10(18)).is_zero());
    }
}
