// src/pools.rs

use ethers::types::{Address, U256, U512};
use serde::{Deserialize, Serialize};

/// Unified pool representation across all supported AMM families.
///
/// Pool state is a read-only snapshot supplied by an external indexer; the
/// quoting path never mutates it and never fetches anything. Every quote is
/// a pure function of this data.
///
/// ## Supported families
///
/// - **Uniswap V2 / SushiSwap**: constant product formula pools
/// - **Uniswap V3**: concentrated liquidity pools with initialized-tick lists
/// - **Balancer V2**: weighted pools and stable pools behind a shared vault
/// - **Curve**: StableSwap bonding-curve pools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Pool {
    UniswapV2(UniswapV2Pool),
    UniswapV3(UniswapV3Pool),
    BalancerWeighted(BalancerWeightedPool),
    BalancerStable(BalancerStablePool),
    CurveStableSwap(CurveStableSwapPool),
}

/// Uniswap V2-style pool using the x * y = k constant product formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniswapV2Pool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: u128,
    pub reserve1: u128,
    /// Swap fee in basis points (30 = 0.3% for both Uniswap V2 and Sushi).
    pub fee_bps: u32,
}

impl UniswapV2Pool {
    /// Price of token0 in terms of token1, scaled by 1e18. Zero reserves
    /// price at zero.
    pub fn price(&self, token0_decimals: u8, token1_decimals: u8) -> U256 {
        if self.reserve0 == 0 || self.reserve1 == 0 {
            return U256::zero();
        }
        let r0 = U256::from(self.reserve0);
        let r1 = U256::from(self.reserve1);
        let scale_diff = 18 + token0_decimals as i32 - token1_decimals as i32;
        if scale_diff >= 0 {
            r1 * U256::exp10(scale_diff as usize) / r0
        } else {
            r1 / U256::exp10(-scale_diff as usize) / r0
        }
    }
}

/// One initialized tick boundary in a concentrated-liquidity pool.
///
/// `liquidity_net` is the signed liquidity delta applied when the price
/// crosses this tick moving left-to-right (ascending price).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TickEntry {
    pub tick: i32,
    pub liquidity_net: i128,
}

/// Uniswap V3 pool with concentrated liquidity.
///
/// The tick-based pricing system concentrates liquidity in price ranges;
/// quotes that exhaust the active range must walk `ticks` stepwise. `ticks`
/// holds only initialized ticks, sorted ascending.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UniswapV3Pool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    /// Fee in pips (hundredths of a basis point): 100, 500, 3000 or 10000.
    pub fee: u32,
    pub sqrt_price_x96: U256,
    pub liquidity: u128,
    pub tick: i32,
    pub tick_spacing: i32,
    pub ticks: Vec<TickEntry>,
}

impl UniswapV3Pool {
    /// Price of token0 in terms of token1, scaled by 1e18.
    ///
    /// price = sqrt_price_x96^2 * 10^(18 + d0 - d1) / 2^192
    pub fn price(&self, token0_decimals: u8, token1_decimals: u8) -> U256 {
        if self.sqrt_price_x96.is_zero() {
            return U256::zero();
        }
        let price_x192: U512 = self.sqrt_price_x96.full_mul(self.sqrt_price_x96);
        let scale_diff = 18 + token0_decimals as i32 - token1_decimals as i32;
        let scaled = if scale_diff >= 0 {
            price_x192 * U512::from(U256::exp10(scale_diff as usize))
        } else {
            price_x192 / U512::from(U256::exp10(-scale_diff as usize))
        };
        U256::try_from(scaled >> 192).unwrap_or_else(|_| U256::max_value())
    }
}

/// Balancer V2 weighted pool. Balances are raw token units; weights and the
/// swap fee are 1e18 fixed point. `tokens`, `balances`, `weights` and
/// `decimals` are index-aligned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerWeightedPool {
    pub address: Address,
    pub pool_id: [u8; 32],
    pub tokens: Vec<Address>,
    pub balances: Vec<U256>,
    pub weights: Vec<U256>,
    pub swap_fee: U256,
    /// Token decimals, index-aligned with `tokens`, for scaling amounts to
    /// the 18-decimal internal representation.
    pub decimals: Vec<u8>,
}

/// Balancer V2 stable pool (StableSwap invariant behind the vault).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerStablePool {
    pub address: Address,
    pub pool_id: [u8; 32],
    pub tokens: Vec<Address>,
    pub balances: Vec<U256>,
    /// Amplification parameter, already multiplied by the Balancer
    /// AMP_PRECISION of 1e3.
    pub amplification: U256,
    pub swap_fee: U256,
    pub decimals: Vec<u8>,
}

/// Curve StableSwap pool. Balances are raw token units; `rates` scale each
/// balance to 1e18 precision (e.g. 1e30 for a 6-decimal token).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveStableSwapPool {
    pub address: Address,
    pub tokens: Vec<Address>,
    pub balances: Vec<U256>,
    pub rates: Vec<U256>,
    /// Amplification coefficient A (not A * n^n).
    pub amplification: U256,
    /// Output fee in 1e10 precision (4000000 = 0.04%).
    pub fee: U256,
}

impl Pool {
    pub fn address(&self) -> Address {
        match self {
            Pool::UniswapV2(p) => p.address,
            Pool::UniswapV3(p) => p.address,
            Pool::BalancerWeighted(p) => p.address,
            Pool::BalancerStable(p) => p.address,
            Pool::CurveStableSwap(p) => p.address,
        }
    }

    pub fn tokens(&self) -> Vec<Address> {
        match self {
            Pool::UniswapV2(p) => vec![p.token0, p.token1],
            Pool::UniswapV3(p) => vec![p.token0, p.token1],
            Pool::BalancerWeighted(p) => p.tokens.clone(),
            Pool::BalancerStable(p) => p.tokens.clone(),
            Pool::CurveStableSwap(p) => p.tokens.clone(),
        }
    }

    /// Whether this pool covers both legs of a quote. Every quote computed
    /// against a pool must satisfy this.
    pub fn covers(&self, token_in: Address, token_out: Address) -> bool {
        let tokens = self.tokens();
        token_in != token_out && tokens.contains(&token_in) && tokens.contains(&token_out)
    }

    pub fn fee_bps(&self) -> u32 {
        match self {
            Pool::UniswapV2(p) => p.fee_bps,
            Pool::UniswapV3(p) => p.fee / 100,
            Pool::BalancerWeighted(p) => (p.swap_fee / U256::exp10(14)).as_u32(),
            Pool::BalancerStable(p) => (p.swap_fee / U256::exp10(14)).as_u32(),
            Pool::CurveStableSwap(p) => (p.fee / U256::exp10(6)).as_u32(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::from([b; 20])
    }

    #[test]
    fn v2_price_scaled() {
        let pool = UniswapV2Pool {
            address: addr(1),
            token0: addr(2),
            token1: addr(3),
            reserve0: 1_000 * 10u128.pow(18),
            reserve1: 1_800_000 * 10u128.pow(18),
            fee_bps: 30,
        };
        // 1800 token1 per token0, 1e18 scaled
        assert_eq!(pool.price(18, 18), U256::from(1800u64) * U256::exp10(18));
    }

    #[test]
    fn v2_price_zero_reserves() {
        let pool = UniswapV2Pool {
            address: addr(1),
            token0: addr(2),
            token1: addr(3),
            reserve0: 0,
            reserve1: 5,
            fee_bps: 30,
        };
        assert!(pool.price(18, 18).is_zero());
    }

    #[test]
    fn v3_price_at_unit_sqrt() {
        let pool = UniswapV3Pool {
            sqrt_price_x96: U256::one() << 96,
            ..Default::default()
        };
        assert_eq!(pool.price(18, 18), U256::exp10(18));
    }

    #[test]
    fn pool_covers_both_legs() {
        let pool = Pool::UniswapV2(UniswapV2Pool {
            address: addr(1),
            token0: addr(2),
            token1: addr(3),
            reserve0: 1,
            reserve1: 1,
            fee_bps: 30,
        });
        assert!(pool.covers(addr(2), addr(3)));
        assert!(pool.covers(addr(3), addr(2)));
        assert!(!pool.covers(addr(2), addr(4)));
        assert!(!pool.covers(addr(2), addr(2)));
    }
}
