//! Core data model: tokens, venues, quotes and route descriptors.
//!
//! A [`Quote`] is the per-venue pricing result; the [`Router`] picks the best
//! one and the caller freezes it into a [`RouteDescriptor`] by applying a
//! [`SlippageConfig`]. All of these are created fresh per query and never
//! shared mutably.
//!
//! [`Router`]: crate::router::SwapRouter

use crate::errors::PricerError;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// An ERC-20 style token reference: address plus decimal precision.
///
/// Immutable, externally supplied reference data; the engine never mutates
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    /// Decimals are capped at 24; anything above is reference-data
    /// corruption, not a token we can price.
    pub fn new(address: Address, decimals: u8) -> Result<Self, PricerError> {
        if decimals > 24 {
            return Err(PricerError::InvalidDecimals(decimals));
        }
        Ok(Self { address, decimals })
    }
}

/// Venue identifier for routing.
///
/// A closed set: every quoting strategy the engine knows about is a variant
/// here, dispatched exhaustively. Venue-specific route parameters (pool ids,
/// fee tiers, connector token) travel in [`Quote`]'s aux fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Venue {
    #[default]
    ConstantProductV2,
    ConstantProductSushi,
    ConcentratedLiquidity,
    ConcentratedLiquidityWithConnector,
    WeightedPool,
    WeightedPoolWithConnector,
    /// Explicit multi-hop Balancer route. Built by callers with real pool
    /// ids and settled by the executor; never enumerated during routing.
    WeightedPoolBatch,
    StablePool,
    BondingCurve,
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Venue::ConstantProductV2 => write!(f, "UniswapV2"),
            Venue::ConstantProductSushi => write!(f, "SushiSwapV2"),
            Venue::ConcentratedLiquidity => write!(f, "UniswapV3"),
            Venue::ConcentratedLiquidityWithConnector => write!(f, "UniswapV3WithConnector"),
            Venue::WeightedPool => write!(f, "Balancer"),
            Venue::WeightedPoolWithConnector => write!(f, "BalancerWithConnector"),
            Venue::WeightedPoolBatch => write!(f, "BalancerBatch"),
            Venue::StablePool => write!(f, "BalancerStable"),
            Venue::BondingCurve => write!(f, "Curve"),
        }
    }
}

/// A priced swap on one venue.
///
/// `amount_out == 0` means "this venue cannot price the pair at this size".
/// It is a sentinel, not an error. A non-zero `amount_out` is directly usable as a
/// minimum-output bound once slippage is applied. The `venue` tag of a zero
/// quote carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Quote {
    pub venue: Venue,
    pub amount_out: U256,
    /// Pool ids (Balancer) or pool addresses widened to 32 bytes, one per
    /// hop. Empty for venues that resolve pools from the registry.
    pub pools: Vec<[u8; 32]>,
    /// Concentrated-liquidity fee tiers in pips (e.g. 500 = 0.05%), one per
    /// hop.
    pub pool_fees: Vec<u32>,
    /// Intermediate asset for connector-hop venues.
    pub connector: Option<Address>,
}

impl Quote {
    pub fn direct(venue: Venue, amount_out: U256) -> Self {
        Self {
            venue,
            amount_out,
            ..Default::default()
        }
    }

    /// The zero sentinel: no venue could price the pair.
    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn is_supported(&self) -> bool {
        !self.amount_out.is_zero()
    }

    /// Freeze this quote into an execution-ready route, bounding the
    /// acceptable output by the slippage tolerance.
    pub fn with_slippage(self, slippage: &SlippageConfig) -> RouteDescriptor {
        let min_output = slippage.min_output(self.amount_out);
        RouteDescriptor {
            quote: self,
            min_output,
        }
    }
}

/// The chosen quote, normalized into an execution-ready form. Built once per
/// top-level query; immutable once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub quote: Quote,
    pub min_output: U256,
}

/// Basis-point slippage tolerance applied uniformly when converting a quoted
/// output into an execution minimum. Policy owned by the caller, not the
/// router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageConfig {
    bps: u32,
}

impl SlippageConfig {
    pub const MAX_BPS: u32 = 10_000;

    pub fn new(bps: u32) -> Result<Self, PricerError> {
        if bps > Self::MAX_BPS {
            return Err(PricerError::InvalidSlippage(bps));
        }
        Ok(Self { bps })
    }

    pub fn bps(&self) -> u32 {
        self.bps
    }

    /// `amount_out * (10000 - bps) / 10000`, floor.
    pub fn min_output(&self, amount_out: U256) -> U256 {
        amount_out * U256::from(Self::MAX_BPS - self.bps) / U256::from(Self::MAX_BPS)
    }
}

/// Widen a pool address into the 32-byte aux-payload slot used by
/// [`Quote::pools`]. Left-aligned, matching ABI encoding of `bytes32`.
pub fn address_to_pool_slot(address: Address) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[..20].copy_from_slice(address.as_bytes());
    slot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slippage_min_output() {
        let s = SlippageConfig::new(50).unwrap(); // 0.5%
        assert_eq!(
            s.min_output(U256::from(10_000u64)),
            U256::from(9_950u64)
        );
        // zero tolerance keeps the quote intact
        let s0 = SlippageConfig::new(0).unwrap();
        assert_eq!(s0.min_output(U256::from(12_345u64)), U256::from(12_345u64));
    }

    #[test]
    fn slippage_rejects_over_100_percent() {
        assert_eq!(
            SlippageConfig::new(10_001).unwrap_err(),
            PricerError::InvalidSlippage(10_001)
        );
    }

    #[test]
    fn token_decimals_bounds() {
        assert!(Token::new(Address::zero(), 24).is_ok());
        assert_eq!(
            Token::new(Address::zero(), 25).unwrap_err(),
            PricerError::InvalidDecimals(25)
        );
    }

    #[test]
    fn zero_quote_is_unsupported() {
        assert!(!Quote::unsupported().is_supported());
        assert!(Quote::direct(Venue::ConstantProductV2, U256::one()).is_supported());
    }

    #[test]
    fn pool_slot_is_left_aligned() {
        let address = Address::from([0xab; 20]);
        let slot = address_to_pool_slot(address);
        assert_eq!(&slot[..20], address.as_bytes());
        assert!(slot[20..].iter().all(|b| *b == 0));
    }
}
