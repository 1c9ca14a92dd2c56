//! Swap execution against an owned balance ledger.
//!
//! [`ExecutionAdapter`] settles a previously built [`RouteDescriptor`]
//! atomically. The route's venue tag is authoritative: settlement re-prices
//! the swap on that venue alone, driven by the pool ids and fee tiers frozen
//! into the quote, and balances move only once nothing can fail. Any error
//! leaves the ledger exactly as it was.

use ethers::types::{Address, U256};
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::errors::PricerError;
use crate::quoter::{balancer, curve, uniswap_v2, uniswap_v3};
use crate::router::SwapRouter;
use crate::types::{RouteDescriptor, Venue};

pub struct ExecutionAdapter {
    router: SwapRouter,
    balances: IndexMap<Address, U256>,
}

impl ExecutionAdapter {
    pub fn new(router: SwapRouter) -> Self {
        Self {
            router,
            balances: IndexMap::new(),
        }
    }

    pub fn router(&self) -> &SwapRouter {
        &self.router
    }

    pub fn deposit(&mut self, token: Address, amount: U256) {
        let balance = self.balances.entry(token).or_insert_with(U256::zero);
        *balance += amount;
    }

    pub fn balance_of(&self, token: Address) -> U256 {
        self.balances.get(&token).copied().unwrap_or_default()
    }

    /// Execute an exact-input swap along a frozen route.
    ///
    /// The route is re-priced on its tagged venue against the current
    /// registry snapshot; when that venue can no longer serve the pair the
    /// attempt fails with [`PricerError::UnroutableVenue`], and when the
    /// realized output falls below the route's minimum it fails with
    /// [`PricerError::SlippageExceeded`]. Either way no balance moves.
    /// `deadline` is unix seconds, validated against `now` before anything
    /// else.
    pub fn execute(
        &mut self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        route: &RouteDescriptor,
        deadline: Option<u64>,
        now: u64,
    ) -> Result<U256, PricerError> {
        if let Some(deadline) = deadline {
            if now > deadline {
                return Err(PricerError::DeadlineExpired { deadline, now });
            }
        }

        let available = self.balance_of(token_in);
        if available < amount_in {
            return Err(PricerError::InsufficientBalance {
                token: token_in,
                available,
                required: amount_in,
            });
        }

        let actual = self.price_route(token_in, token_out, amount_in, route)?;
        if actual < route.min_output {
            warn!(
                %actual,
                min_output = %route.min_output,
                "execution reverted on slippage"
            );
            return Err(PricerError::SlippageExceeded {
                min_output: route.min_output,
                actual,
            });
        }

        // nothing can fail past this point; settle both legs
        self.balances.insert(token_in, available - amount_in);
        let out_balance = self.balances.entry(token_out).or_insert_with(U256::zero);
        *out_balance += actual;

        info!(
            ?token_in,
            ?token_out,
            %amount_in,
            %actual,
            venue = %route.quote.venue,
            "swap executed"
        );
        Ok(actual)
    }

    /// Re-price the route on its tagged venue only, through the quote's
    /// frozen pool ids, fee tiers and connector.
    fn price_route(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        route: &RouteDescriptor,
    ) -> Result<U256, PricerError> {
        let reg = self.router.registry();
        let quote = &route.quote;
        let amount_out = match quote.venue {
            Venue::ConstantProductV2 => {
                uniswap_v2::quote_uniswap(reg, token_in, token_out, amount_in)
            }
            Venue::ConstantProductSushi => {
                uniswap_v2::quote_sushiswap(reg, token_in, token_out, amount_in)
            }
            Venue::ConcentratedLiquidity => {
                let fee = quote.pool_fees.first().copied().unwrap_or(0);
                uniswap_v3::quote_tier(reg, token_in, token_out, amount_in, fee)
            }
            Venue::ConcentratedLiquidityWithConnector => {
                let connector = quote.connector.unwrap_or_else(|| reg.connector());
                let (fee_one, fee_two) = match quote.pool_fees.as_slice() {
                    [a, b] => (*a, *b),
                    _ => (0, 0),
                };
                let leg_one = uniswap_v3::quote_tier(reg, token_in, connector, amount_in, fee_one);
                if leg_one.is_zero() {
                    U256::zero()
                } else {
                    uniswap_v3::quote_tier(reg, connector, token_out, leg_one, fee_two)
                }
            }
            Venue::WeightedPool | Venue::StablePool => match quote.pools.as_slice() {
                [pool_id] => {
                    balancer::quote_batch(reg, &[*pool_id], &[token_in, token_out], amount_in)?
                }
                _ => U256::zero(),
            },
            // connector routes settle as a two-leg batch; explicit batch
            // routes carry one or two pool ids with the connector bridging
            Venue::WeightedPoolWithConnector | Venue::WeightedPoolBatch => {
                let connector = quote.connector.unwrap_or_else(|| reg.connector());
                match quote.pools.as_slice() {
                    [pool_id] => {
                        balancer::quote_batch(reg, &[*pool_id], &[token_in, token_out], amount_in)?
                    }
                    [first, second] => balancer::quote_batch(
                        reg,
                        &[*first, *second],
                        &[token_in, connector, token_out],
                        amount_in,
                    )?,
                    _ => U256::zero(),
                }
            }
            Venue::BondingCurve => curve::quote(reg, token_in, token_out, amount_in),
        };
        if amount_out.is_zero() {
            return Err(PricerError::UnroutableVenue(quote.venue));
        }
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::UniswapV2Pool;
    use crate::registry::PoolRegistry;
    use crate::settings::PricerSettings;
    use crate::types::{Quote, SlippageConfig};

    fn addr(b: u8) -> Address {
        Address::from([b; 20])
    }

    fn adapter() -> ExecutionAdapter {
        let mut reg = PoolRegistry::new(&PricerSettings::default());
        reg.add_uniswap_v2(UniswapV2Pool {
            address: addr(1),
            token0: addr(2),
            token1: addr(3),
            reserve0: 1_000 * 10u128.pow(18),
            reserve1: 1_800_000 * 10u128.pow(18),
            fee_bps: 30,
        });
        ExecutionAdapter::new(SwapRouter::new(reg))
    }

    #[test]
    fn executes_and_settles_both_legs() {
        let mut adapter = adapter();
        let amount_in = U256::exp10(18);
        adapter.deposit(addr(2), amount_in);

        let quote = adapter.router().find_optimal_swap(addr(2), addr(3), amount_in);
        let expected = quote.amount_out;
        let route = quote.with_slippage(&SlippageConfig::new(50).unwrap());

        let out = adapter
            .execute(addr(2), addr(3), amount_in, &route, None, 0)
            .unwrap();
        assert_eq!(out, expected);
        assert!(adapter.balance_of(addr(2)).is_zero());
        assert_eq!(adapter.balance_of(addr(3)), expected);
    }

    #[test]
    fn deadline_is_checked_before_balances() {
        let mut adapter = adapter();
        // no deposit at all; the deadline error must still win
        let quote = adapter.router().find_optimal_swap(addr(2), addr(3), U256::exp10(18));
        let route = quote.with_slippage(&SlippageConfig::new(0).unwrap());
        assert_eq!(
            adapter
                .execute(addr(2), addr(3), U256::exp10(18), &route, Some(100), 101)
                .unwrap_err(),
            PricerError::DeadlineExpired {
                deadline: 100,
                now: 101
            }
        );
    }

    #[test]
    fn insufficient_balance_reverts_cleanly() {
        let mut adapter = adapter();
        adapter.deposit(addr(2), U256::exp10(17));
        let quote = adapter.router().find_optimal_swap(addr(2), addr(3), U256::exp10(18));
        let route = quote.with_slippage(&SlippageConfig::new(50).unwrap());
        let err = adapter
            .execute(addr(2), addr(3), U256::exp10(18), &route, None, 0)
            .unwrap_err();
        assert!(matches!(err, PricerError::InsufficientBalance { .. }));
        assert_eq!(adapter.balance_of(addr(2)), U256::exp10(17));
        assert!(adapter.balance_of(addr(3)).is_zero());
    }

    #[test]
    fn route_venue_without_a_pool_is_unroutable() {
        let mut adapter = adapter();
        adapter.deposit(addr(2), U256::exp10(18));
        // a curve-tagged route against a registry that only has a v2 pool
        let quote = Quote::direct(Venue::BondingCurve, U256::one());
        let route = quote.with_slippage(&SlippageConfig::new(0).unwrap());
        let err = adapter
            .execute(addr(2), addr(3), U256::exp10(18), &route, None, 0)
            .unwrap_err();
        assert_eq!(err, PricerError::UnroutableVenue(Venue::BondingCurve));
        assert_eq!(adapter.balance_of(addr(2)), U256::exp10(18));
        assert!(adapter.balance_of(addr(3)).is_zero());
    }
}
