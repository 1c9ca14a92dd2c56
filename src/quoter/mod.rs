//! Per-venue quoting strategies.
//!
//! Each submodule prices one AMM family against the registry snapshot and
//! returns a plain output amount; zero means the venue cannot serve the
//! pair at this size. Route selection across venues lives in
//! [`crate::router`].

pub mod balancer;
pub mod curve;
pub mod uniswap_v2;
pub mod uniswap_v3;
