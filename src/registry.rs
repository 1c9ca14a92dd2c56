//! In-memory pool registry: the snapshot every quote is computed against.
//!
//! Populated from indexer output (serde-friendly structs in
//! [`crate::pools`]) and then only read. All maps are [`IndexMap`] so
//! iteration order, and therefore tie-breaking downstream, is
//! insertion-stable.

use ethers::types::Address;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PricerError;
use crate::pools::{
    BalancerStablePool, BalancerWeightedPool, CurveStableSwapPool, Pool, UniswapV2Pool,
    UniswapV3Pool,
};
use crate::settings::PricerSettings;

/// Sentinel returned when no Balancer pool covers a pair. Callers treat it
/// as "try another venue", never as an error.
pub const NONEXISTENT_POOL_ID: [u8; 32] = [0u8; 32];

type Pair = (Address, Address);

fn ordered_pair(a: Address, b: Address) -> Pair {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRegistry {
    connector: Address,
    fee_tiers: Vec<u32>,
    v2_pools: IndexMap<Pair, UniswapV2Pool>,
    sushi_pools: IndexMap<Pair, UniswapV2Pool>,
    v3_pools: IndexMap<Pair, Vec<UniswapV3Pool>>,
    balancer_pools: IndexMap<[u8; 32], Pool>,
    balancer_pairs: IndexMap<Pair, [u8; 32]>,
    curve_pools: IndexMap<Pair, CurveStableSwapPool>,
    token_decimals: IndexMap<Address, u8>,
}

impl PoolRegistry {
    pub fn new(settings: &PricerSettings) -> Self {
        Self {
            connector: settings.routing.connector,
            fee_tiers: settings.routing.fee_tiers.clone(),
            v2_pools: IndexMap::new(),
            sushi_pools: IndexMap::new(),
            v3_pools: IndexMap::new(),
            balancer_pools: IndexMap::new(),
            balancer_pairs: IndexMap::new(),
            curve_pools: IndexMap::new(),
            token_decimals: IndexMap::new(),
        }
    }

    pub fn connector(&self) -> Address {
        self.connector
    }

    pub fn fee_tiers(&self) -> &[u32] {
        &self.fee_tiers
    }

    /// Decimals for a token, defaulting to 18 when the indexer did not
    /// supply metadata.
    pub fn decimals(&self, token: Address) -> u8 {
        self.token_decimals.get(&token).copied().unwrap_or(18)
    }

    pub fn register_token(&mut self, token: Address, decimals: u8) {
        self.token_decimals.insert(token, decimals);
    }

    pub fn add_uniswap_v2(&mut self, pool: UniswapV2Pool) {
        debug!(address = ?pool.address, "registering uniswap v2 pool");
        self.v2_pools
            .entry(ordered_pair(pool.token0, pool.token1))
            .or_insert(pool);
    }

    pub fn add_sushiswap(&mut self, pool: UniswapV2Pool) {
        debug!(address = ?pool.address, "registering sushiswap pool");
        self.sushi_pools
            .entry(ordered_pair(pool.token0, pool.token1))
            .or_insert(pool);
    }

    pub fn add_uniswap_v3(&mut self, pool: UniswapV3Pool) {
        debug!(address = ?pool.address, fee = pool.fee, "registering uniswap v3 pool");
        let pair = ordered_pair(pool.token0, pool.token1);
        let tiers = self.v3_pools.entry(pair).or_default();
        if tiers.iter().all(|p| p.fee != pool.fee) {
            tiers.push(pool);
            tiers.sort_by_key(|p| p.fee);
        }
    }

    pub fn add_balancer_weighted(&mut self, pool: BalancerWeightedPool) {
        debug!(pool_id = %hex::encode(pool.pool_id), "registering balancer weighted pool");
        self.index_balancer_pairs(&pool.tokens, pool.pool_id);
        self.balancer_pools
            .insert(pool.pool_id, Pool::BalancerWeighted(pool));
    }

    pub fn add_balancer_stable(&mut self, pool: BalancerStablePool) {
        debug!(pool_id = %hex::encode(pool.pool_id), "registering balancer stable pool");
        self.index_balancer_pairs(&pool.tokens, pool.pool_id);
        self.balancer_pools
            .insert(pool.pool_id, Pool::BalancerStable(pool));
    }

    fn index_balancer_pairs(&mut self, tokens: &[Address], pool_id: [u8; 32]) {
        for (i, a) in tokens.iter().enumerate() {
            for b in tokens.iter().skip(i + 1) {
                // first registered pool wins the pair mapping
                self.balancer_pairs
                    .entry(ordered_pair(*a, *b))
                    .or_insert(pool_id);
            }
        }
    }

    pub fn add_curve(&mut self, pool: CurveStableSwapPool) {
        debug!(address = ?pool.address, "registering curve pool");
        let tokens = pool.tokens.clone();
        for (i, a) in tokens.iter().enumerate() {
            for b in tokens.iter().skip(i + 1) {
                self.curve_pools
                    .entry(ordered_pair(*a, *b))
                    .or_insert_with(|| pool.clone());
            }
        }
    }

    pub fn uniswap_v2_pool(&self, token_a: Address, token_b: Address) -> Option<&UniswapV2Pool> {
        self.v2_pools.get(&ordered_pair(token_a, token_b))
    }

    pub fn sushiswap_pool(&self, token_a: Address, token_b: Address) -> Option<&UniswapV2Pool> {
        self.sushi_pools.get(&ordered_pair(token_a, token_b))
    }

    /// All concentrated-liquidity pools for a pair, ascending by fee tier.
    pub fn uniswap_v3_pools(&self, token_a: Address, token_b: Address) -> &[UniswapV3Pool] {
        self.v3_pools
            .get(&ordered_pair(token_a, token_b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Balancer pool id covering a pair, or [`NONEXISTENT_POOL_ID`].
    pub fn balancer_pool_id(&self, token_a: Address, token_b: Address) -> [u8; 32] {
        self.balancer_pairs
            .get(&ordered_pair(token_a, token_b))
            .copied()
            .unwrap_or(NONEXISTENT_POOL_ID)
    }

    /// Resolve an explicit Balancer pool id. A missing descriptor is a
    /// caller error, never silently zero liquidity.
    pub fn balancer_pool(&self, pool_id: [u8; 32]) -> Result<&Pool, PricerError> {
        self.balancer_pools
            .get(&pool_id)
            .ok_or(PricerError::MissingRegistryData { pool_id })
    }

    pub fn curve_pool(&self, token_a: Address, token_b: Address) -> Option<&CurveStableSwapPool> {
        self.curve_pools.get(&ordered_pair(token_a, token_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PricerSettings;
    use ethers::types::U256;

    fn addr(b: u8) -> Address {
        Address::from([b; 20])
    }

    fn registry() -> PoolRegistry {
        PoolRegistry::new(&PricerSettings::default())
    }

    #[test]
    fn v2_lookup_is_order_insensitive() {
        let mut reg = registry();
        reg.add_uniswap_v2(UniswapV2Pool {
            address: addr(1),
            token0: addr(2),
            token1: addr(3),
            reserve0: 10,
            reserve1: 10,
            fee_bps: 30,
        });
        assert!(reg.uniswap_v2_pool(addr(2), addr(3)).is_some());
        assert!(reg.uniswap_v2_pool(addr(3), addr(2)).is_some());
        assert!(reg.uniswap_v2_pool(addr(2), addr(4)).is_none());
        // sushi table is independent
        assert!(reg.sushiswap_pool(addr(2), addr(3)).is_none());
    }

    #[test]
    fn v3_tiers_deduplicate_and_sort() {
        let mut reg = registry();
        for fee in [3000u32, 500, 3000, 100] {
            reg.add_uniswap_v3(UniswapV3Pool {
                address: addr(fee as u8),
                token0: addr(2),
                token1: addr(3),
                fee,
                ..Default::default()
            });
        }
        let tiers: Vec<u32> = reg
            .uniswap_v3_pools(addr(3), addr(2))
            .iter()
            .map(|p| p.fee)
            .collect();
        assert_eq!(tiers, vec![100, 500, 3000]);
    }

    #[test]
    fn balancer_pair_index_covers_all_combinations() {
        let mut reg = registry();
        let pool_id = [7u8; 32];
        reg.add_balancer_stable(BalancerStablePool {
            address: addr(1),
            pool_id,
            tokens: vec![addr(2), addr(3), addr(4)],
            balances: vec![U256::exp10(18); 3],
            amplification: U256::from(2_000_000u64),
            swap_fee: U256::zero(),
            decimals: vec![18; 3],
        });
        assert_eq!(reg.balancer_pool_id(addr(2), addr(4)), pool_id);
        assert_eq!(reg.balancer_pool_id(addr(3), addr(2)), pool_id);
        assert_eq!(reg.balancer_pool_id(addr(2), addr(9)), NONEXISTENT_POOL_ID);
        assert!(reg.balancer_pool(pool_id).is_ok());
    }

    #[test]
    fn unknown_balancer_pool_id_is_a_hard_error() {
        let reg = registry();
        let missing = [9u8; 32];
        assert_eq!(
            reg.balancer_pool(missing).unwrap_err(),
            PricerError::MissingRegistryData { pool_id: missing }
        );
    }

    #[test]
    fn decimals_default_to_18() {
        let mut reg = registry();
        reg.register_token(addr(2), 6);
        assert_eq!(reg.decimals(addr(2)), 6);
        assert_eq!(reg.decimals(addr(3)), 18);
    }
}
