// src/errors.rs

use crate::types::Venue;
use ethers::types::{Address, U256};
use thiserror::Error;

/// Error taxonomy for quoting and execution.
///
/// Quoting keeps "no venue can price this" out of this enum entirely: an
/// unsupported pair is signaled by a zero-amount [`crate::types::Quote`]
/// sentinel so batch scans over many pairs stay cheap. Errors here are
/// either caller mistakes (bad pool id, bad slippage) or fatal execution
/// conditions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricerError {
    /// The sell-side token is not a member of the explicitly supplied pool.
    #[error("token {token:?} is not the sell-side member of pool {pool_id}", pool_id = hex::encode(.pool_id))]
    UnsupportedTokenIn { pool_id: [u8; 32], token: Address },

    /// The buy-side token is not a member of the explicitly supplied pool.
    #[error("token {token:?} is not the buy-side member of pool {pool_id}", pool_id = hex::encode(.pool_id))]
    UnsupportedTokenOut { pool_id: [u8; 32], token: Address },

    /// A referenced pool id has no descriptor in the registry snapshot.
    /// Never silently treated as zero liquidity.
    #[error("no registry data for pool {pool_id}", pool_id = hex::encode(.pool_id))]
    MissingRegistryData { pool_id: [u8; 32] },

    /// Actual execution output fell short of the quoted minimum. The
    /// attempt is fully reverted; the caller must re-quote to retry.
    #[error("slippage exceeded: got {actual}, minimum was {min_output}")]
    SlippageExceeded { min_output: U256, actual: U256 },

    /// The executing account does not hold the sell amount.
    #[error("insufficient balance of {token:?}: have {available}, need {required}")]
    InsufficientBalance {
        token: Address,
        available: U256,
        required: U256,
    },

    /// The execution deadline passed before any state was touched.
    #[error("deadline {deadline} expired at {now}")]
    DeadlineExpired { deadline: u64, now: u64 },

    /// The route's tagged venue cannot price the pair against the current
    /// snapshot. The route is stale; re-quote and rebuild it.
    #[error("venue {0} cannot serve the routed pair")]
    UnroutableVenue(Venue),

    /// Slippage tolerance outside 0..=10_000 basis points.
    #[error("invalid slippage tolerance: {0} bps")]
    InvalidSlippage(u32),

    /// Token decimals outside the supported 0..=24 range.
    #[error("invalid token decimals: {0}")]
    InvalidDecimals(u8),
}
