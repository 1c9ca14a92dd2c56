// Pure AMM math, shared by all quoters. Everything here is deterministic
// integer arithmetic on snapshot data; no pool lookups, no I/O.

pub mod balancer;
pub mod curve;
pub mod v2;
pub mod v3;

use ethers::types::{U256, U512};

/// floor(a * b / denominator) with a 512-bit intermediate. Returns zero on a
/// zero denominator and saturates if the quotient does not fit in 256 bits.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::zero();
    }
    let product = a.full_mul(b);
    U256::try_from(product / U512::from(denominator)).unwrap_or_else(|_| U256::max_value())
}

/// ceil(a * b / denominator), same overflow behavior as [`mul_div`].
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::zero();
    }
    let (quotient, remainder) = a.full_mul(b).div_mod(U512::from(denominator));
    let quotient = if remainder.is_zero() {
        quotient
    } else {
        quotient + U512::one()
    };
    U256::try_from(quotient).unwrap_or_else(|_| U256::max_value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_survives_256_bit_intermediate() {
        // (2^200 * 2^100) / 2^100 overflows U256 mid-product but not the result
        let a = U256::one() << 200;
        let b = U256::one() << 100;
        assert_eq!(mul_div(a, b, b), a);
    }

    #[test]
    fn mul_div_rounding_directions() {
        let seven = U256::from(7u64);
        let three = U256::from(3u64);
        assert_eq!(mul_div(seven, U256::one(), three), U256::from(2u64));
        assert_eq!(mul_div_rounding_up(seven, U256::one(), three), U256::from(3u64));
        assert_eq!(
            mul_div_rounding_up(U256::from(6u64), U256::one(), three),
            U256::from(2u64)
        );
    }

    #[test]
    fn zero_denominator_yields_zero() {
        assert!(mul_div(U256::one(), U256::one(), U256::zero()).is_zero());
        assert!(mul_div_rounding_up(U256::one(), U256::one(), U256::zero()).is_zero());
    }
}
