// Uniswap V3 tick and sqrt-price math for direct quoting without the
// on-chain Quoter. Exact Q64.96 integer arithmetic throughout; every
// intermediate that can exceed 256 bits goes through a 512-bit product.

use ethers::types::{U256, U512};
use once_cell::sync::Lazy;

use super::{mul_div, mul_div_rounding_up};

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;
/// sqrt(1.0001^-887272) * 2^96
pub const MIN_SQRT_RATIO: U256 = U256([4295128739, 0, 0, 0]);
/// sqrt(1.0001^887272) * 2^96
pub const MAX_SQRT_RATIO: U256 =
    U256([6743328256752651558, 17280870778742802505, 4294805859, 0]);

/// 2^96
pub const Q96: U256 = U256([0, 4294967296, 0, 0]);

const FEE_DENOMINATOR: u32 = 1_000_000;

// Per-bit multipliers for sqrt(1.0001^-2^i) in Q128.128, i = 0..=19.
static TICK_BIT_RATIOS: Lazy<[U256; 20]> = Lazy::new(|| {
    [
        "fffcb933bd6fad37aa2d162d1a594001",
        "fff97272373d413259a46990580e213a",
        "fff2e50f5f656932ef12357cf3c7fdcc",
        "ffe5caca7e10e4e61c3624eaa0941cd0",
        "ffcb9843d60f6159c9db58835c926644",
        "ff973b41fa98c081472e6896dfb254c0",
        "ff2ea16466c96a3843ec78b326b52861",
        "fe5dee046a99a2a811c461f1969c3053",
        "fcbe86c7900a88aedcffc83b479aa3a4",
        "f987a7253ac413176f2b074cf7815e54",
        "f3392b0822b70005940c7a398e4b70f3",
        "e7159475a2c29b7443b29c7fa6e889d9",
        "d097f3bdfd2022b8845ad8f792aa5825",
        "a9f746462d870fdf8a65dc1f90e061e5",
        "70d869a156d2a1b890bb3df62baf32f7",
        "31be135f97d08fd981231505542fcfa6",
        "09aa508b5b7a84e1c677de54f3e99bc9",
        "005d6af8dedb81196699c329225ee604",
        "00002216e584f5fa1ea926041bedfe98",
        "0000000000048a170391f7dc42444e8fa2",
    ]
    .map(|hex| U256::from_str_radix(hex, 16).expect("tick ratio literal"))
});

fn mul_shift_128(a: U256, b: U256) -> U256 {
    U256::try_from(a.full_mul(b) >> 128).unwrap_or_else(|_| U256::max_value())
}

/// sqrt(1.0001^tick) * 2^96 (TickMath.getSqrtRatioAtTick equivalent).
/// Out-of-range ticks return zero.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> U256 {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return U256::zero();
    }
    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 1 != 0 {
        TICK_BIT_RATIOS[0]
    } else {
        U256::one() << 128
    };
    for (bit, multiplier) in TICK_BIT_RATIOS.iter().enumerate().skip(1) {
        if abs_tick & (1 << bit) != 0 {
            ratio = mul_shift_128(ratio, *multiplier);
        }
    }
    if tick > 0 {
        ratio = U256::max_value() / ratio;
    }

    // Q128.128 -> Q64.96, rounding up so round-tripping through
    // get_tick_at_sqrt_ratio stays consistent with the reference contract
    let round = if (ratio & ((U256::one() << 32) - 1)).is_zero() {
        U256::zero()
    } else {
        U256::one()
    };
    (ratio >> 32) + round
}

/// Greatest tick whose ratio is <= the given sqrt price (inverse of the
/// above). Binary search over the exact forward function.
pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: U256) -> i32 {
    if sqrt_price_x96 < MIN_SQRT_RATIO {
        return MIN_TICK;
    }
    if sqrt_price_x96 >= MAX_SQRT_RATIO {
        return MAX_TICK;
    }
    let mut low = MIN_TICK;
    let mut high = MAX_TICK;
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if get_sqrt_ratio_at_tick(mid) <= sqrt_price_x96 {
            low = mid;
        } else {
            high = mid;
        }
    }
    low
}

/// Token0 owed when the sqrt price moves between two ratios at constant
/// liquidity: liquidity * 2^96 * (b - a) / (b * a).
pub fn get_amount0_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> U256 {
    let (lower, upper) = if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    } else {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    };
    if lower.is_zero() {
        return U256::zero();
    }
    let numerator1 = U256::from(liquidity) << 96;
    let numerator2 = upper - lower;
    if round_up {
        let scaled = mul_div_rounding_up(numerator1, numerator2, upper);
        let (quotient, remainder) = scaled.div_mod(lower);
        if remainder.is_zero() {
            quotient
        } else {
            quotient + U256::one()
        }
    } else {
        mul_div(numerator1, numerator2, upper) / lower
    }
}

/// Token1 owed when the sqrt price moves between two ratios at constant
/// liquidity: liquidity * (b - a) / 2^96.
pub fn get_amount1_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> U256 {
    let (lower, upper) = if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    } else {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    };
    if round_up {
        mul_div_rounding_up(U256::from(liquidity), upper - lower, Q96)
    } else {
        mul_div(U256::from(liquidity), upper - lower, Q96)
    }
}

/// Sqrt price after spending `amount_in` of the input token. Always rounds
/// toward the current price so the pool never pays out more than it should.
pub fn get_next_sqrt_price_from_input(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> U256 {
    if amount_in.is_zero() || liquidity == 0 {
        return sqrt_price_x96;
    }
    if zero_for_one {
        next_sqrt_price_from_amount0_rounding_up(sqrt_price_x96, liquidity, amount_in)
    } else {
        next_sqrt_price_from_amount1_rounding_down(sqrt_price_x96, liquidity, amount_in)
    }
}

// next = ceil(liquidity * 2^96 * sqrtP / (liquidity * 2^96 + amount * sqrtP))
fn next_sqrt_price_from_amount0_rounding_up(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount: U256,
) -> U256 {
    let numerator1 = U512::from(liquidity) << 96;
    let denominator = numerator1 + amount.full_mul(sqrt_price_x96);
    let (quotient, remainder) = (numerator1 * U512::from(sqrt_price_x96)).div_mod(denominator);
    let quotient = if remainder.is_zero() {
        quotient
    } else {
        quotient + U512::one()
    };
    U256::try_from(quotient).unwrap_or_else(|_| U256::max_value())
}

// next = sqrtP + floor(amount * 2^96 / liquidity)
fn next_sqrt_price_from_amount1_rounding_down(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount: U256,
) -> U256 {
    let quotient = mul_div(amount, Q96, U256::from(liquidity));
    sqrt_price_x96.saturating_add(quotient)
}

/// One step of an exact-input swap within a single liquidity range
/// (SwapMath.computeSwapStep equivalent).
///
/// Returns `(amount_in, amount_out, sqrt_ratio_next_x96, fee_amount)`.
/// `amount_in` excludes the fee; the caller consumes
/// `amount_in + fee_amount` from its remaining input.
pub fn compute_swap_step(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_target_x96: U256,
    liquidity: u128,
    amount_remaining: U256,
    fee_pips: u32,
) -> (U256, U256, U256, U256) {
    let zero_for_one = sqrt_ratio_current_x96 >= sqrt_ratio_target_x96;

    let amount_remaining_less_fee = mul_div(
        amount_remaining,
        U256::from(FEE_DENOMINATOR - fee_pips),
        U256::from(FEE_DENOMINATOR),
    );
    let amount_in_to_target = if zero_for_one {
        get_amount0_delta(
            sqrt_ratio_target_x96,
            sqrt_ratio_current_x96,
            liquidity,
            true,
        )
    } else {
        get_amount1_delta(
            sqrt_ratio_current_x96,
            sqrt_ratio_target_x96,
            liquidity,
            true,
        )
    };

    let sqrt_ratio_next_x96 = if amount_remaining_less_fee >= amount_in_to_target {
        sqrt_ratio_target_x96
    } else {
        get_next_sqrt_price_from_input(
            sqrt_ratio_current_x96,
            liquidity,
            amount_remaining_less_fee,
            zero_for_one,
        )
    };
    let reached_target = sqrt_ratio_next_x96 == sqrt_ratio_target_x96;

    let (amount_in, amount_out) = if zero_for_one {
        (
            if reached_target {
                amount_in_to_target
            } else {
                get_amount0_delta(
                    sqrt_ratio_next_x96,
                    sqrt_ratio_current_x96,
                    liquidity,
                    true,
                )
            },
            get_amount1_delta(
                sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            ),
        )
    } else {
        (
            if reached_target {
                amount_in_to_target
            } else {
                get_amount1_delta(
                    sqrt_ratio_current_x96,
                    sqrt_ratio_next_x96,
                    liquidity,
                    true,
                )
            },
            get_amount0_delta(
                sqrt_ratio_current_x96,
                sqrt_ratio_next_x96,
                liquidity,
                false,
            ),
        )
    };

    let fee_amount = if !reached_target {
        // the whole remainder is consumed; whatever is not principal is fee
        amount_remaining.saturating_sub(amount_in)
    } else {
        mul_div_rounding_up(
            amount_in,
            U256::from(fee_pips),
            U256::from(FEE_DENOMINATOR - fee_pips),
        )
    };

    (amount_in, amount_out, sqrt_ratio_next_x96, fee_amount)
}
