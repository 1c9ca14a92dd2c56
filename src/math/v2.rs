// Constant product (x * y = k) swap math, shared by Uniswap V2 and Sushi.

use ethers::types::{U256, U512};

const BPS_DENOMINATOR: u32 = 10_000;

/// Output amount for an exact-input swap against constant product reserves.
///
/// `amount_out = floor(amount_in * (10000 - fee_bps) * reserve_out /
/// (reserve_in * 10000 + amount_in * (10000 - fee_bps)))`
///
/// Degenerate inputs (zero amount, empty reserves, fee >= 100%) quote zero
/// rather than erroring; the pool simply offers nothing.
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee_bps: u32) -> U256 {
    if amount_in.is_zero()
        || reserve_in.is_zero()
        || reserve_out.is_zero()
        || fee_bps >= BPS_DENOMINATOR
    {
        return U256::zero();
    }
    let fee_factor = U256::from(BPS_DENOMINATOR - fee_bps);
    let amount_in_with_fee = amount_in.full_mul(fee_factor);
    let numerator = match amount_in_with_fee.checked_mul(U512::from(reserve_out)) {
        Some(n) => n,
        None => return reserve_out - U256::one(),
    };
    let denominator = reserve_in.full_mul(U256::from(BPS_DENOMINATOR)) + amount_in_with_fee;
    U256::try_from(numerator / denominator).unwrap_or_else(|_| U256::max_value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_against_deep_reserves() {
        // 1 native into a 1000 / 1_800_000 pool at 0.3%
        let amount_in = U256::exp10(18);
        let reserve_in = U256::from(1_000u64) * U256::exp10(18);
        let reserve_out = U256::from(1_800_000u64) * U256::exp10(18);

        let expected = amount_in * U256::from(997u64) * reserve_out
            / (reserve_in * U256::from(1000u64) + amount_in * U256::from(997u64));
        assert_eq!(get_amount_out(amount_in, reserve_in, reserve_out, 30), expected);
    }

    #[test]
    fn zero_inputs_quote_zero() {
        let r = U256::exp10(18);
        assert!(get_amount_out(U256::zero(), r, r, 30).is_zero());
        assert!(get_amount_out(r, U256::zero(), r, 30).is_zero());
        assert!(get_amount_out(r, r, U256::zero(), 30).is_zero());
        assert!(get_amount_out(r, r, r, 10_000).is_zero());
    }

    #[test]
    fn output_is_monotone_in_input() {
        let reserve_in = U256::from(1_000u64) * U256::exp10(18);
        let reserve_out = U256::from(2_000u64) * U256::exp10(18);
        let small = get_amount_out(U256::exp10(17), reserve_in, reserve_out, 30);
        let large = get_amount_out(U256::exp10(18), reserve_in, reserve_out, 30);
        assert!(large > small);
        // and strictly below the no-impact spot rate
        assert!(large < U256::from(2u64) * U256::exp10(18));
    }

    #[test]
    fn output_never_exceeds_reserve() {
        let reserve_in = U256::exp10(18);
        let reserve_out = U256::exp10(18);
        let out = get_amount_out(U256::exp10(24), reserve_in, reserve_out, 30);
        assert!(out < reserve_out);
    }
}
