// Balancer fixed-point math: 1e18 "BONE" arithmetic for weighted pools and
// the amplified StableSwap invariant used by stable pools. Matches the
// on-chain rounding (half-up on mul/div, iterative power series) so a
// simulated swap replays what the vault would do.

use ethers::types::{U256, U512};

use super::mul_div;

/// 1e18, the fixed-point unit.
pub const BONE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Balancer stores amplification multiplied by this precision.
pub const AMP_PRECISION: u64 = 1_000;

const MAX_POW_ITERATIONS: u32 = 100;

/// Fixed-point multiply, half-up rounding.
pub fn bmul(a: U256, b: U256) -> U256 {
    let product = a.full_mul(b) + U512::from(BONE / 2);
    U256::try_from(product / U512::from(BONE)).unwrap_or_else(|_| U256::max_value())
}

/// Fixed-point divide, half-up rounding. Zero divisor yields zero.
pub fn bdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let numerator = a.full_mul(BONE) + U512::from(b / 2);
    U256::try_from(numerator / U512::from(b)).unwrap_or_else(|_| U256::max_value())
}

fn bsub_sign(a: U256, b: U256) -> (U256, bool) {
    if a >= b {
        (a - b, false)
    } else {
        (b - a, true)
    }
}

/// base^n for a whole-number exponent, by repeated squaring in fixed point.
pub fn bpowi(base: U256, mut n: u64) -> U256 {
    let mut result = if n % 2 != 0 { base } else { BONE };
    let mut square = base;
    n /= 2;
    while n != 0 {
        square = bmul(square, square);
        if n % 2 != 0 {
            result = bmul(result, square);
        }
        n /= 2;
    }
    result
}

/// base^exp for a fixed-point exponent: whole part by squaring, fractional
/// part by a binomial series truncated at `precision`.
pub fn bpow(base: U256, exp: U256) -> U256 {
    if base.is_zero() {
        return U256::zero();
    }
    let whole = exp / BONE;
    let remain = exp - whole * BONE;
    let whole_pow = bpowi(base, whole.as_u64());
    if remain.is_zero() {
        return whole_pow;
    }
    // series precision of 1e-10 in fixed-point units
    let partial = bpow_approx(base, remain, BONE / U256::from(10_000_000_000u64));
    bmul(whole_pow, partial)
}

fn bpow_approx(base: U256, exp: U256, precision: U256) -> U256 {
    let (x, x_neg) = bsub_sign(base, BONE);
    let mut term = BONE;
    let mut sum = BONE;
    let mut negative = false;

    for i in 1..=MAX_POW_ITERATIONS {
        let big_k = U256::from(i) * BONE;
        let (coeff, coeff_neg) = bsub_sign(exp, big_k - BONE);
        term = bmul(term, bmul(coeff, x));
        term = bdiv(term, big_k);
        if term.is_zero() {
            break;
        }
        if x_neg {
            negative = !negative;
        }
        if coeff_neg {
            negative = !negative;
        }
        if negative {
            sum = sum.saturating_sub(term);
        } else {
            sum += term;
        }
        if term < precision {
            break;
        }
    }
    sum
}

/// Weighted-pool out-given-in, all values 1e18 fixed point:
///
/// `out = balance_out * (1 - (balance_in / (balance_in + in * (1 - fee)))^(w_in / w_out))`
pub fn calc_out_given_in_weighted(
    balance_in: U256,
    weight_in: U256,
    balance_out: U256,
    weight_out: U256,
    amount_in: U256,
    swap_fee: U256,
) -> U256 {
    if balance_in.is_zero() || balance_out.is_zero() || weight_out.is_zero() || swap_fee >= BONE {
        return U256::zero();
    }
    let adjusted_in = bmul(amount_in, BONE - swap_fee);
    let base = bdiv(balance_in, balance_in + adjusted_in);
    let weight_ratio = bdiv(weight_in, weight_out);
    let power = bpow(base, weight_ratio);
    bmul(balance_out, BONE.saturating_sub(power))
}

/// StableSwap invariant D for amplified pools, Newton iteration. Balances
/// are 1e18 scaled; `amp` carries [`AMP_PRECISION`].
pub fn calculate_invariant(amp: U256, balances: &[U256]) -> U256 {
    let n = U256::from(balances.len());
    let sum: U256 = balances.iter().fold(U256::zero(), |acc, b| acc + b);
    if sum.is_zero() {
        return U256::zero();
    }
    let ann = amp * n;
    let amp_precision = U256::from(AMP_PRECISION);

    let mut d = sum;
    for _ in 0..255 {
        let mut d_p = d;
        for balance in balances {
            d_p = mul_div(d_p, d, *balance * n);
        }
        let prev = d;
        let numerator = mul_div(ann, sum, amp_precision) + d_p * n;
        let denominator = mul_div(ann - amp_precision, d, amp_precision) + (n + 1) * d_p;
        d = mul_div(numerator, d, denominator);
        let diff = if d > prev { d - prev } else { prev - d };
        if diff <= U256::one() {
            break;
        }
    }
    d
}

/// Post-swap balance of token `index_out` that keeps the invariant at `d`,
/// given the other balances (with the input balance already bumped).
pub fn get_token_balance_given_invariant(
    amp: U256,
    balances: &[U256],
    d: U256,
    index_out: usize,
) -> U256 {
    let n = U256::from(balances.len());
    let ann = amp * n;
    let amp_precision = U256::from(AMP_PRECISION);

    let mut c = d;
    let mut sum = U256::zero();
    for (k, balance) in balances.iter().enumerate() {
        if k == index_out {
            continue;
        }
        sum += *balance;
        c = mul_div(c, d, *balance * n);
    }
    c = mul_div(c, d * amp_precision, ann * n);
    let b = sum + mul_div(d, amp_precision, ann);

    let mut y = d;
    for _ in 0..255 {
        let prev = y;
        let denominator = (U256::from(2u64) * y + b).saturating_sub(d);
        if denominator.is_zero() {
            return U256::zero();
        }
        let numerator = y.full_mul(y) + U512::from(c);
        y = U256::try_from(numerator / U512::from(denominator))
            .unwrap_or_else(|_| U256::max_value());
        let diff = if y > prev { y - prev } else { prev - y };
        if diff <= U256::one() {
            break;
        }
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bone(n: u64) -> U256 {
        U256::from(n) * BONE
    }

    #[test]
    fn bmul_bdiv_round_half_up() {
        assert_eq!(bmul(bone(3), bone(4)), bone(12));
        assert_eq!(bdiv(bone(1), bone(2)), BONE / 2);
        // 1/3 in fixed point rounds the last digit
        let third = bdiv(BONE, bone(3));
        assert_eq!(third, U256::from(333_333_333_333_333_333u64));
    }

    #[test]
    fn bpow_whole_and_fractional() {
        assert_eq!(bpowi(bone(2), 10), bone(1024));
        // 1.5^0.5; the series converges for bases below 2.0
        let root = bpow(BONE * 3 / 2, BONE / 2);
        let expected = U256::from(1_224_744_871_391_589_049u64);
        let diff = if root > expected { root - expected } else { expected - root };
        assert!(diff < U256::from(1_000_000_000u64));
    }

    #[test]
    fn weighted_out_equal_weights_matches_constant_product() {
        // 50/50 pool degenerates to x*y=k
        let balance_in = bone(1_000);
        let balance_out = bone(2_000);
        let amount_in = bone(10);
        let out = calc_out_given_in_weighted(
            balance_in,
            BONE / 2,
            balance_out,
            BONE / 2,
            amount_in,
            U256::zero(),
        );
        let expected = mul_div(amount_in, balance_out, balance_in + amount_in);
        let diff = if out > expected { out - expected } else { expected - out };
        // series truncation leaves a tiny residual
        assert!(diff < bone(1) / U256::from(1_000_000u64));
    }

    #[test]
    fn invariant_of_balanced_pool_is_the_sum() {
        let balances = vec![bone(1_000_000); 3];
        let amp = U256::from(2000u64 * AMP_PRECISION);
        let d = calculate_invariant(amp, &balances);
        let sum = bone(3_000_000);
        let diff = if d > sum { d - sum } else { sum - d };
        assert!(diff <= U256::from(3u64));
    }

    #[test]
    fn stable_swap_near_parity_for_deep_pool() {
        let balances = vec![bone(1_000_000), bone(1_000_000)];
        let amp = U256::from(2000u64 * AMP_PRECISION);
        let d = calculate_invariant(amp, &balances);

        let amount_in = bone(1_000);
        let bumped = vec![balances[0] + amount_in, balances[1]];
        let y = get_token_balance_given_invariant(amp, &bumped, d, 1);
        let out = balances[1].saturating_sub(y).saturating_sub(U256::one());

        // amplified pool trades close to 1:1
        assert!(out > bone(999));
        assert!(out <= amount_in);
    }
}
