//! # dex-pricer
//!
//! An optimal-swap pricing and routing engine over snapshot liquidity data.
//! Given a pair of tokens and an exact input amount, the engine prices the
//! swap on every supported venue, picks the best route deterministically,
//! and can settle it against an owned balance ledger with atomic slippage
//! enforcement.
//!
//! ## Supported venues
//!
//! - **Uniswap V2 / SushiSwap**: constant product pools
//! - **Uniswap V3**: concentrated liquidity with full cross-tick simulation
//! - **Balancer V2**: weighted and stable pools, single-hop and batch
//! - **Curve**: StableSwap pools
//!
//! ## Architecture
//!
//! Pool state lives in a [`PoolRegistry`] snapshot supplied by an external
//! indexer; quoting never performs I/O. [`math`] holds the per-family swap
//! arithmetic, [`quoter`] prices one venue at a time, and
//! [`SwapRouter::find_optimal_swap`] selects across them. An unsupported
//! pair is a zero-amount [`Quote`], not an error. [`ExecutionAdapter`]
//! turns a chosen quote into a balance movement, reverting atomically when
//! the realized output misses the slippage-adjusted minimum.

/// Error taxonomy
pub mod errors;
/// Core data model: tokens, venues, quotes, slippage
pub mod types;
/// Per-venue pool state structs
pub mod pools;
/// Snapshot registry and pair lookup
pub mod registry;
/// Pure swap arithmetic per AMM family
pub mod math;
/// Per-venue quoting strategies
pub mod quoter;
/// Cross-venue route selection
pub mod router;
/// Atomic execution against a balance ledger
pub mod executor;
/// Configuration management
pub mod settings;

pub use errors::PricerError;
pub use executor::ExecutionAdapter;
pub use pools::Pool;
pub use registry::{PoolRegistry, NONEXISTENT_POOL_ID};
pub use router::SwapRouter;
pub use settings::PricerSettings;
pub use types::{Quote, RouteDescriptor, SlippageConfig, Token, Venue};
