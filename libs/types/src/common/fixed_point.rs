//! Fixed-point arithmetic for square-root prices and growth accumulators
//!
//! Square-root prices are Q64.96 values and per-liquidity growth is Q128.128.
//! Intermediate products are computed at 512 bits so that `a * b / d` never
//! loses precision before the final division.
//!
//! ## Design Principles
//!
//! - **No Precision Loss**: full-width products before every division
//! - **Overflow Protection**: checked narrowing with clear error handling
//! - **Modular Growth**: accumulators wrap explicitly over 2^256

use crate::common::errors::FixedPointError;
use primitive_types::{U256, U512};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;

/// Number of fractional bits of a square-root price
pub const RESOLUTION: u32 = 96;

/// 2^96 as a `u128`
pub const Q96: u128 = 1 << RESOLUTION;

/// 2^96 as a `U256`
pub const Q96_U256: U256 = U256([0, 1 << 32, 0, 0]);

/// `floor(a * b / denominator)` with a 512-bit intermediate
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, FixedPointError> {
    if denominator.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }
    let quotient = a.full_mul(b) / U512::from(denominator);
    U256::try_from(quotient).map_err(|_| FixedPointError::Overflow {
        operation: "mul_div",
    })
}

/// `ceil(a * b / denominator)` with a 512-bit intermediate
pub fn mul_div_rounding_up(
    a: U256,
    b: U256,
    denominator: U256,
) -> Result<U256, FixedPointError> {
    if denominator.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }
    let product = a.full_mul(b);
    let wide_denominator = U512::from(denominator);
    let quotient = U256::try_from(product / wide_denominator).map_err(|_| {
        FixedPointError::Overflow {
            operation: "mul_div_rounding_up",
        }
    })?;
    if (product % wide_denominator).is_zero() {
        Ok(quotient)
    } else {
        quotient
            .checked_add(U256::one())
            .ok_or(FixedPointError::Overflow {
                operation: "mul_div_rounding_up",
            })
    }
}

/// `ceil(a / b)`
pub fn div_rounding_up(a: U256, b: U256) -> Result<U256, FixedPointError> {
    if b.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }
    let (quotient, remainder) = a.div_mod(b);
    if remainder.is_zero() {
        Ok(quotient)
    } else {
        Ok(quotient + U256::one())
    }
}

/// Narrow a 256-bit value to `u128`, failing instead of truncating
pub fn narrow_u128(value: U256, operation: &'static str) -> Result<u128, FixedPointError> {
    if value.bits() > 128 {
        return Err(FixedPointError::Overflow { operation });
    }
    Ok(value.low_u128())
}

/// Truncate a decimal toward zero into an `i128` token amount
pub fn decimal_to_i128(value: Decimal) -> Result<i128, FixedPointError> {
    value
        .trunc()
        .to_i128()
        .ok_or_else(|| FixedPointError::NotRepresentable {
            value: value.to_string(),
            target: "i128",
        })
}

/// Signed per-unit-liquidity growth in Q128.128, stored as a 256-bit
/// two's-complement word.
///
/// All additions and subtractions wrap modulo 2^256. Only differences between
/// two readings of the same accumulator carry meaning, and those differences
/// stay exact across any number of wraps as long as the true difference fits
/// in 255 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GrowthX128(U256);

impl GrowthX128 {
    /// Zero growth
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));

    /// Wrap a raw 256-bit word
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Raw 256-bit word
    pub const fn raw(self) -> U256 {
        self.0
    }

    /// Growth produced by a signed token `delta` spread over `liquidity`.
    ///
    /// `delta * 2^128 / liquidity`, rounded toward zero.
    pub fn from_delta(delta: i128, liquidity: u128) -> Result<Self, FixedPointError> {
        if liquidity == 0 {
            return Err(FixedPointError::DivisionByZero);
        }
        let magnitude = (U256::from(delta.unsigned_abs()) << 128) / U256::from(liquidity);
        if delta < 0 {
            Ok(Self(negate(magnitude)))
        } else {
            Ok(Self(magnitude))
        }
    }

    pub fn wrapping_add(self, rhs: Self) -> Self {
        Self(self.0.overflowing_add(rhs.0).0)
    }

    pub fn wrapping_sub(self, rhs: Self) -> Self {
        Self(self.0.overflowing_sub(rhs.0).0)
    }

    /// Sign bit of the two's-complement reading
    pub fn is_negative(self) -> bool {
        self.0.bit(255)
    }

    /// Token amount accrued by `liquidity` over this growth delta, rounded
    /// toward zero.
    pub fn accrue(self, liquidity: u128) -> Result<i128, FixedPointError> {
        let negative = self.is_negative();
        let magnitude = if negative { negate(self.0) } else { self.0 };
        let scaled = magnitude.full_mul(U256::from(liquidity)) >> 128;
        let scaled = U256::try_from(scaled).map_err(|_| FixedPointError::Overflow {
            operation: "growth accrue",
        })?;
        let amount = narrow_u128(scaled, "growth accrue")?;
        let amount = i128::try_from(amount).map_err(|_| FixedPointError::Overflow {
            operation: "growth accrue",
        })?;
        Ok(if negative { -amount } else { amount })
    }
}

fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

/// Display implementation for convenient logging
impl fmt::Display for GrowthX128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}", negate(self.0))
        } else {
            write!(f, "{}", self.0)
        }
    }
}
