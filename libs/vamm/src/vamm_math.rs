//! Dated IRS conversions between base notional, liquidity and fixed tokens
//!
//! Prices on the tick lattice are fixed rates in percent, `1.0001^(-tick)`.
//! Converting a base amount into fixed tokens needs the average rate over
//! the ticks the amount is spread across, the time left to maturity and the
//! current variable-rate index.

use crate::error::{VammError, VammResult};
use crate::swap_math::amount1_delta_signed;
use crate::tick_math::{price_at_tick, sqrt_price_at_tick};
use primitive_types::U256;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use types::{decimal_to_i128, mul_div, narrow_u128, Q96_U256};

/// Seconds in a 365-day year
pub const SECONDS_IN_YEAR: u64 = 31_536_000;

/// Dated IRS math on the tick lattice
pub struct VammMath;

impl VammMath {
    /// Fraction of a 365-day year between `now` and `maturity`, zero once matured
    pub fn years_until_maturity(now: u64, maturity_timestamp: u64) -> Decimal {
        let remaining = maturity_timestamp.saturating_sub(now);
        Decimal::from(remaining) / Decimal::from(SECONDS_IN_YEAR)
    }

    /// Mean of `1.0001^(-t)` for `t` in `[tick_lower, tick_upper]`, in percent.
    ///
    /// Closed form of the geometric series:
    /// `(10001 * p(lower) - 10000 * p(upper)) / (upper - lower + 1)`.
    pub fn average_price_between_ticks(tick_lower: i32, tick_upper: i32) -> VammResult<Decimal> {
        if tick_lower > tick_upper {
            return Err(VammError::InvalidTickRange {
                lower: tick_lower,
                upper: tick_upper,
            });
        }
        let overflow = || VammError::ArithmeticOverflow {
            operation: "average_price_between_ticks",
        };

        let lower = price_at_tick(tick_lower)?;
        let upper = price_at_tick(tick_upper)?;
        let numerator = dec!(10001)
            .checked_mul(lower)
            .zip(dec!(10000).checked_mul(upper))
            .and_then(|(a, b)| a.checked_sub(b))
            .ok_or_else(overflow)?;
        let count = Decimal::from(i64::from(tick_upper) - i64::from(tick_lower) + 1);
        numerator.checked_div(count).ok_or_else(overflow)
    }

    /// Fixed tokens equivalent to `base` spread uniformly over a tick range.
    ///
    /// `-base * rate_index * (1 + average_rate * years_to_maturity)`,
    /// truncated toward zero. The uniform-spread assumption only holds when no
    /// other initialized tick lies strictly inside the range.
    ///
    /// # Arguments
    /// * `base` - Signed base amount from the liquidity providers' side
    /// * `tick_lower`, `tick_upper` - Inclusive tick range the amount covers
    /// * `years_to_maturity` - See [`VammMath::years_until_maturity`]
    /// * `rate_index` - Current variable-rate index of the market
    pub fn fixed_tokens_in_range(
        base: i128,
        tick_lower: i32,
        tick_upper: i32,
        years_to_maturity: Decimal,
        rate_index: Decimal,
    ) -> VammResult<i128> {
        if base == 0 {
            return Ok(0);
        }
        let overflow = || VammError::ArithmeticOverflow {
            operation: "fixed_tokens_in_range",
        };

        let average_rate = Self::average_price_between_ticks(tick_lower, tick_upper)?
            .checked_div(dec!(100))
            .ok_or_else(overflow)?;
        let accrual = average_rate
            .checked_mul(years_to_maturity)
            .and_then(|a| a.checked_add(Decimal::ONE))
            .ok_or_else(overflow)?;
        let base = Decimal::try_from_i128_with_scale(base, 0).map_err(|_| overflow())?;
        let fixed = base
            .checked_mul(rate_index)
            .and_then(|v| v.checked_mul(accrual))
            .ok_or_else(overflow)?;
        Ok(decimal_to_i128(-fixed)?)
    }

    /// Signed base notional held by `liquidity` across `[tick_lower, tick_upper]`
    pub fn base_between_ticks(
        tick_lower: i32,
        tick_upper: i32,
        liquidity: i128,
    ) -> VammResult<i128> {
        amount1_delta_signed(
            sqrt_price_at_tick(tick_lower)?,
            sqrt_price_at_tick(tick_upper)?,
            liquidity,
        )
    }

    /// Liquidity that spreads `base` notional uniformly over the range
    pub fn liquidity_for_base(tick_lower: i32, tick_upper: i32, base: u128) -> VammResult<u128> {
        if tick_lower >= tick_upper {
            return Err(VammError::InvalidTickRange {
                lower: tick_lower,
                upper: tick_upper,
            });
        }
        let upper = U256::from(sqrt_price_at_tick(tick_upper)?);
        let lower = U256::from(sqrt_price_at_tick(tick_lower)?);
        let liquidity = mul_div(U256::from(base), Q96_U256, upper - lower)?;
        Ok(narrow_u128(liquidity, "liquidity_for_base")?)
    }
}
