//! Square-root price AMM step math
//!
//! Token amounts between two square-root prices for a fixed liquidity, the
//! price reached after adding or removing an amount, and a single fee-less
//! swap step. Rounding always favours the pool: amounts paid in round up,
//! amounts paid out round down.
//!
//! Token0 is the notional-per-price leg and token1 is the base leg,
//! `amount1 = L * (sqrt_b - sqrt_a) / 2^96`.

use crate::error::{VammError, VammResult};
use primitive_types::U256;
use types::{div_rounding_up, mul_div, mul_div_rounding_up, narrow_u128, Q96_U256, RESOLUTION};

/// Outcome of one swap step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapStep {
    pub sqrt_price_next_x96: u128,
    pub amount_in: u128,
    pub amount_out: u128,
}

fn sorted(a: u128, b: u128) -> (u128, u128) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

/// Token0 between two prices
pub fn amount0_delta(
    sqrt_ratio_a_x96: u128,
    sqrt_ratio_b_x96: u128,
    liquidity: u128,
    round_up: bool,
) -> VammResult<u128> {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if lower == 0 {
        return Err(VammError::SqrtPriceOutOfBounds { sqrt_price_x96: 0 });
    }

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let numerator2 = U256::from(upper - lower);
    let amount = if round_up {
        div_rounding_up(
            mul_div_rounding_up(numerator1, numerator2, U256::from(upper))?,
            U256::from(lower),
        )?
    } else {
        mul_div(numerator1, numerator2, U256::from(upper))? / U256::from(lower)
    };
    Ok(narrow_u128(amount, "amount0_delta")?)
}

/// Token1 (base) between two prices
pub fn amount1_delta(
    sqrt_ratio_a_x96: u128,
    sqrt_ratio_b_x96: u128,
    liquidity: u128,
    round_up: bool,
) -> VammResult<u128> {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    let liquidity = U256::from(liquidity);
    let width = U256::from(upper - lower);
    let amount = if round_up {
        mul_div_rounding_up(liquidity, width, Q96_U256)?
    } else {
        mul_div(liquidity, width, Q96_U256)?
    };
    Ok(narrow_u128(amount, "amount1_delta")?)
}

/// Signed token1 for a signed liquidity change: rounds up when liquidity is
/// added and down (then negated) when it is removed
pub fn amount1_delta_signed(
    sqrt_ratio_a_x96: u128,
    sqrt_ratio_b_x96: u128,
    liquidity: i128,
) -> VammResult<i128> {
    let to_signed = |amount: u128| {
        i128::try_from(amount).map_err(|_| VammError::ArithmeticOverflow {
            operation: "amount1_delta_signed",
        })
    };
    if liquidity < 0 {
        let amount = amount1_delta(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?;
        Ok(-to_signed(amount)?)
    } else {
        let amount = amount1_delta(sqrt_ratio_a_x96, sqrt_ratio_b_x96, liquidity as u128, true)?;
        to_signed(amount)
    }
}

fn next_sqrt_price_from_amount0_rounding_up(
    sqrt_price_x96: u128,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> VammResult<u128> {
    if amount == 0 {
        return Ok(sqrt_price_x96);
    }
    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let sqrt_price = U256::from(sqrt_price_x96);
    let amount = U256::from(amount);
    let product = amount.checked_mul(sqrt_price);

    let next = if add {
        match product.and_then(|p| numerator1.checked_add(p)) {
            Some(denominator) => mul_div_rounding_up(numerator1, sqrt_price, denominator)?,
            None => div_rounding_up(numerator1, (numerator1 / sqrt_price) + amount)?,
        }
    } else {
        let product = product.ok_or(VammError::ArithmeticOverflow {
            operation: "next_sqrt_price_from_amount0",
        })?;
        if numerator1 <= product {
            return Err(VammError::ArithmeticOverflow {
                operation: "next_sqrt_price_from_amount0",
            });
        }
        mul_div_rounding_up(numerator1, sqrt_price, numerator1 - product)?
    };
    Ok(narrow_u128(next, "next_sqrt_price_from_amount0")?)
}

fn next_sqrt_price_from_amount1_rounding_down(
    sqrt_price_x96: u128,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> VammResult<u128> {
    let sqrt_price = U256::from(sqrt_price_x96);
    let next = if add {
        let quotient = mul_div(U256::from(amount), Q96_U256, U256::from(liquidity))?;
        sqrt_price
            .checked_add(quotient)
            .ok_or(VammError::ArithmeticOverflow {
                operation: "next_sqrt_price_from_amount1",
            })?
    } else {
        let quotient = mul_div_rounding_up(U256::from(amount), Q96_U256, U256::from(liquidity))?;
        if sqrt_price <= quotient {
            return Err(VammError::ArithmeticOverflow {
                operation: "next_sqrt_price_from_amount1",
            });
        }
        sqrt_price - quotient
    };
    Ok(narrow_u128(next, "next_sqrt_price_from_amount1")?)
}

/// Price after paying `amount_in` of token0 (`zero_for_one`) or token1
pub fn next_sqrt_price_from_input(
    sqrt_price_x96: u128,
    liquidity: u128,
    amount_in: u128,
    zero_for_one: bool,
) -> VammResult<u128> {
    if zero_for_one {
        next_sqrt_price_from_amount0_rounding_up(sqrt_price_x96, liquidity, amount_in, true)
    } else {
        next_sqrt_price_from_amount1_rounding_down(sqrt_price_x96, liquidity, amount_in, true)
    }
}

/// Price after receiving `amount_out` of token1 (`zero_for_one`) or token0
pub fn next_sqrt_price_from_output(
    sqrt_price_x96: u128,
    liquidity: u128,
    amount_out: u128,
    zero_for_one: bool,
) -> VammResult<u128> {
    if zero_for_one {
        next_sqrt_price_from_amount1_rounding_down(sqrt_price_x96, liquidity, amount_out, false)
    } else {
        next_sqrt_price_from_amount0_rounding_up(sqrt_price_x96, liquidity, amount_out, false)
    }
}

/// One fee-less step from `current` toward `target`.
///
/// `amount_remaining >= 0` is exact input, negative is exact output. The
/// direction follows from the two prices: target below current means token0
/// in and token1 out.
pub fn compute_swap_step(
    sqrt_ratio_current_x96: u128,
    sqrt_ratio_target_x96: u128,
    liquidity: u128,
    amount_remaining: i128,
) -> VammResult<SwapStep> {
    let (current, target) = (sqrt_ratio_current_x96, sqrt_ratio_target_x96);
    let zero_for_one = current >= target;
    let exact_in = amount_remaining >= 0;
    let remaining = amount_remaining.unsigned_abs();

    let mut amount_in = 0;
    let mut amount_out = 0;

    let sqrt_next = if exact_in {
        amount_in = if zero_for_one {
            amount0_delta(target, current, liquidity, true)?
        } else {
            amount1_delta(current, target, liquidity, true)?
        };
        if remaining >= amount_in {
            target
        } else {
            next_sqrt_price_from_input(current, liquidity, remaining, zero_for_one)?
        }
    } else {
        amount_out = if zero_for_one {
            amount1_delta(target, current, liquidity, false)?
        } else {
            amount0_delta(current, target, liquidity, false)?
        };
        if remaining >= amount_out {
            target
        } else {
            next_sqrt_price_from_output(current, liquidity, remaining, zero_for_one)?
        }
    };

    let reached_target = target == sqrt_next;

    if zero_for_one {
        if !(reached_target && exact_in) {
            amount_in = amount0_delta(sqrt_next, current, liquidity, true)?;
        }
        if !(reached_target && !exact_in) {
            amount_out = amount1_delta(sqrt_next, current, liquidity, false)?;
        }
    } else {
        if !(reached_target && exact_in) {
            amount_in = amount1_delta(current, sqrt_next, liquidity, true)?;
        }
        if !(reached_target && !exact_in) {
            amount_out = amount0_delta(current, sqrt_next, liquidity, false)?;
        }
    }

    // cap the output at the requested amount
    if !exact_in && amount_out > remaining {
        amount_out = remaining;
    }

    Ok(SwapStep {
        sqrt_price_next_x96: sqrt_next,
        amount_in,
        amount_out,
    })
}
