//! Tick <-> square-root price conversion
//!
//! `sqrt_price_at_tick` reproduces the reference bit-decomposition exactly:
//! each set bit of `|tick|` multiplies a Q128.128 ratio by a precomputed
//! `sqrt(1.0001)^(-2^i)` constant with a truncating shift, positive ticks take
//! the reciprocal, and the final Q64.96 value rounds up.

use crate::error::{VammError, VammResult};
use primitive_types::U256;
use rust_decimal::Decimal;
use types::{mul_div, narrow_u128};

/// Lowest supported tick
pub const MIN_TICK: i32 = -69_100;
/// Highest supported tick
pub const MAX_TICK: i32 = 69_100;

/// `sqrt_price_at_tick(MIN_TICK)`
pub const MIN_SQRT_RATIO: u128 = 2_503_036_416_286_949_174_936_592_462;
/// `sqrt_price_at_tick(MAX_TICK)`
pub const MAX_SQRT_RATIO: u128 = 2_507_794_810_551_837_817_144_115_957_740;

/// Decimal places of [`price_at_tick`]
pub const PRICE_SCALE: u32 = 18;

const BIT_ONE: u128 = 0xfffcb933bd6fad37aa2d162d1a594001;

const RATIO_MULTIPLIERS: [(u32, u128); 16] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x9aa508b5b7a84e1c677de54f3e99bc9),
];

/// Fail unless `tick` lies in `[MIN_TICK, MAX_TICK]`
pub fn check_tick(tick: i32) -> VammResult<()> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(VammError::TickOutOfBounds {
            tick,
            min: MIN_TICK,
            max: MAX_TICK,
        });
    }
    Ok(())
}

/// Q64.96 square-root price of `1.0001^tick`
pub fn sqrt_price_at_tick(tick: i32) -> VammResult<u128> {
    check_tick(tick)?;
    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 0x1 != 0 {
        U256::from(BIT_ONE)
    } else {
        U256::one() << 128
    };
    for (bit, multiplier) in RATIO_MULTIPLIERS {
        if abs_tick & bit != 0 {
            ratio = (ratio * U256::from(multiplier)) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up so the result is never below the true price
    let round_up = if (ratio & U256::from(u32::MAX)).is_zero() {
        U256::zero()
    } else {
        U256::one()
    };
    Ok(narrow_u128((ratio >> 32) + round_up, "sqrt_price_at_tick")?)
}

/// Greatest tick whose square-root price is at or below `sqrt_price_x96`
pub fn tick_at_sqrt_price(sqrt_price_x96: u128) -> VammResult<i32> {
    if !(MIN_SQRT_RATIO..=MAX_SQRT_RATIO).contains(&sqrt_price_x96) {
        return Err(VammError::SqrtPriceOutOfBounds { sqrt_price_x96 });
    }

    let (mut low, mut high) = (MIN_TICK, MAX_TICK);
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if sqrt_price_at_tick(mid)? <= sqrt_price_x96 {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}

/// Fixed-rate price in percent, `1.0001^(-tick)`, truncated to 18 decimals.
///
/// Higher ticks mean lower fixed rates.
pub fn price_at_tick(tick: i32) -> VammResult<Decimal> {
    let sqrt_price = U256::from(sqrt_price_at_tick(tick)?);
    let q192 = U256::one() << 192;
    let wad = U256::exp10(PRICE_SCALE as usize);
    let scaled = mul_div(q192, wad, sqrt_price * sqrt_price)?;
    let scaled = narrow_u128(scaled, "price_at_tick")?;
    let scaled = i128::try_from(scaled).map_err(|_| VammError::ArithmeticOverflow {
        operation: "price_at_tick",
    })?;
    Decimal::try_from_i128_with_scale(scaled, PRICE_SCALE).map_err(|_| {
        VammError::ArithmeticOverflow {
            operation: "price_at_tick",
        }
    })
}
