//! Route selection across all venues.
//!
//! [`SwapRouter::find_optimal_swap`] evaluates a fixed candidate list and
//! keeps the best output under strict comparison, so on a tie the earliest
//! candidate wins. Direct single-pool venues come before connector-hop
//! variants; within the list, venues are ordered by execution cost. The
//! whole pass is a pure function of the registry snapshot.

use ethers::types::{Address, U256};
use tracing::{debug, trace};

use crate::quoter::{balancer, curve, uniswap_v2, uniswap_v3};
use crate::registry::{PoolRegistry, NONEXISTENT_POOL_ID};
use crate::types::{address_to_pool_slot, Quote, Venue};

pub struct SwapRouter {
    registry: PoolRegistry,
}

impl SwapRouter {
    pub fn new(registry: PoolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    /// Best quote across every venue for an exact-input swap. Returns the
    /// zero sentinel when no venue can price the pair; never errors on an
    /// unsupported pair.
    pub fn find_optimal_swap(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Quote {
        if token_in == token_out || amount_in.is_zero() {
            return Quote::unsupported();
        }

        let mut best = Quote::unsupported();
        for candidate in self.candidates(token_in, token_out, amount_in) {
            trace!(venue = %candidate.venue, amount_out = %candidate.amount_out, "candidate quote");
            if candidate.amount_out > best.amount_out {
                best = candidate;
            }
        }

        debug!(
            ?token_in,
            ?token_out,
            %amount_in,
            venue = %best.venue,
            amount_out = %best.amount_out,
            supported = best.is_supported(),
            "optimal swap"
        );
        best
    }

    /// Whether any venue can price the pair at this size. Cheap and
    /// non-reverting for arbitrary token lists; a permanently unsupported
    /// token simply answers `false`.
    pub fn is_pair_supported(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> bool {
        self.find_optimal_swap(token_in, token_out, amount_in)
            .is_supported()
    }

    // Fixed enumeration order; tie-breaking depends on it.
    fn candidates(&self, token_in: Address, token_out: Address, amount_in: U256) -> Vec<Quote> {
        let reg = &self.registry;
        let mut candidates = vec![
            Quote::direct(
                Venue::ConstantProductV2,
                uniswap_v2::quote_uniswap(reg, token_in, token_out, amount_in),
            ),
            Quote::direct(
                Venue::ConstantProductSushi,
                uniswap_v2::quote_sushiswap(reg, token_in, token_out, amount_in),
            ),
        ];

        let (v3_out, v3_fee) = uniswap_v3::sort_pools(reg, token_in, token_out, amount_in);
        let v3_pools = if v3_out.is_zero() {
            Vec::new()
        } else {
            reg.uniswap_v3_pools(token_in, token_out)
                .iter()
                .find(|p| p.fee == v3_fee)
                .map(|p| vec![address_to_pool_slot(p.address)])
                .unwrap_or_default()
        };
        candidates.push(Quote {
            venue: Venue::ConcentratedLiquidity,
            amount_out: v3_out,
            pools: v3_pools,
            pool_fees: vec![v3_fee],
            ..Default::default()
        });

        candidates.push(self.balancer_direct(
            Venue::WeightedPool,
            token_in,
            token_out,
            balancer::quote_weighted(reg, token_in, token_out, amount_in),
        ));
        candidates.push(self.balancer_direct(
            Venue::StablePool,
            token_in,
            token_out,
            balancer::quote_stable(reg, token_in, token_out, amount_in),
        ));

        candidates.push(Quote::direct(
            Venue::BondingCurve,
            curve::quote(reg, token_in, token_out, amount_in),
        ));

        let (v3_hop_out, v3_hop_fees) =
            uniswap_v3::quote_with_connector(reg, token_in, token_out, amount_in);
        candidates.push(Quote {
            venue: Venue::ConcentratedLiquidityWithConnector,
            amount_out: v3_hop_out,
            pool_fees: v3_hop_fees.to_vec(),
            connector: Some(reg.connector()),
            ..Default::default()
        });

        let (bal_hop_out, bal_hop_legs) =
            balancer::quote_with_connector(reg, token_in, token_out, amount_in);
        candidates.push(Quote {
            venue: Venue::WeightedPoolWithConnector,
            amount_out: bal_hop_out,
            pools: if bal_hop_out.is_zero() {
                Vec::new()
            } else {
                bal_hop_legs.to_vec()
            },
            connector: Some(reg.connector()),
            ..Default::default()
        });

        candidates
    }

    fn balancer_direct(
        &self,
        venue: Venue,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
    ) -> Quote {
        let pool_id = self.registry.balancer_pool_id(token_in, token_out);
        let pools = if pool_id == NONEXISTENT_POOL_ID || amount_out.is_zero() {
            Vec::new()
        } else {
            vec![pool_id]
        };
        Quote {
            venue,
            amount_out,
            pools,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::UniswapV2Pool;
    use crate::settings::PricerSettings;

    fn addr(b: u8) -> Address {
        Address::from([b; 20])
    }

    fn v2_pool(token0: Address, token1: Address, r0: u128, r1: u128) -> UniswapV2Pool {
        UniswapV2Pool {
            address: addr(0xaa),
            token0,
            token1,
            reserve0: r0,
            reserve1: r1,
            fee_bps: 30,
        }
    }

    #[test]
    fn empty_registry_yields_sentinel_everywhere() {
        let router = SwapRouter::new(PoolRegistry::new(&PricerSettings::default()));
        let quote = router.find_optimal_swap(addr(2), addr(3), U256::exp10(18));
        assert!(!quote.is_supported());
        assert!(!router.is_pair_supported(addr(2), addr(3), U256::exp10(18)));
    }

    #[test]
    fn same_token_and_zero_amount_are_sentinels() {
        let mut reg = PoolRegistry::new(&PricerSettings::default());
        reg.add_uniswap_v2(v2_pool(addr(2), addr(3), 10u128.pow(21), 10u128.pow(21)));
        let router = SwapRouter::new(reg);
        assert!(!router
            .find_optimal_swap(addr(2), addr(2), U256::exp10(18))
            .is_supported());
        assert!(!router
            .find_optimal_swap(addr(2), addr(3), U256::zero())
            .is_supported());
    }

    #[test]
    fn tie_keeps_the_earliest_venue() {
        // identical pools on both v2 tables quote identically; strict
        // comparison must keep the first candidate
        let mut reg = PoolRegistry::new(&PricerSettings::default());
        reg.add_uniswap_v2(v2_pool(addr(2), addr(3), 10u128.pow(21), 10u128.pow(21)));
        reg.add_sushiswap(v2_pool(addr(2), addr(3), 10u128.pow(21), 10u128.pow(21)));
        let router = SwapRouter::new(reg);
        let quote = router.find_optimal_swap(addr(2), addr(3), U256::exp10(18));
        assert!(quote.is_supported());
        assert_eq!(quote.venue, Venue::ConstantProductV2);
    }

    #[test]
    fn better_sushi_liquidity_wins() {
        let mut reg = PoolRegistry::new(&PricerSettings::default());
        reg.add_uniswap_v2(v2_pool(addr(2), addr(3), 10u128.pow(20), 10u128.pow(20)));
        reg.add_sushiswap(v2_pool(addr(2), addr(3), 10u128.pow(23), 10u128.pow(23)));
        let router = SwapRouter::new(reg);
        let quote = router.find_optimal_swap(addr(2), addr(3), U256::exp10(18));
        assert_eq!(quote.venue, Venue::ConstantProductSushi);
    }

    #[test]
    fn routing_is_deterministic() {
        let mut reg = PoolRegistry::new(&PricerSettings::default());
        reg.add_uniswap_v2(v2_pool(addr(2), addr(3), 10u128.pow(21), 10u128.pow(22)));
        let router = SwapRouter::new(reg);
        let first = router.find_optimal_swap(addr(2), addr(3), U256::exp10(18));
        for _ in 0..10 {
            assert_eq!(router.find_optimal_swap(addr(2), addr(3), U256::exp10(18)), first);
        }
    }
}
