//! Swap engine
//!
//! Walks the price through the tick registry one step at a time. A step ends
//! at the nearest of the next initialized tick, the word boundary of the
//! bitmap search and the caller's limit. Each filled step converts its base
//! amount into fixed tokens over the ticks it covered and spreads both over
//! the active liquidity as growth.
//!
//! [`simulate_swap`] only reads engine state. It returns a [`SwapPlan`] with
//! the new state and every crossed tick record, which the facade commits once
//! the whole walk succeeded.

use crate::error::{VammError, VammResult};
use crate::state::VammState;
use crate::swap_math::compute_swap_step;
use crate::tick::{add_liquidity_delta, GrowthGlobals, TickInfo, TickRegistry};
use crate::tick_math::{sqrt_price_at_tick, tick_at_sqrt_price};
use crate::vamm_config::VammMutableConfig;
use crate::vamm_math::VammMath;
use rust_decimal::Decimal;
use tracing::{debug, trace};
use types::GrowthX128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapParams {
    /// Base notional: positive pays base into the pool and moves the tick up,
    /// negative takes base out and moves it down
    pub amount_specified: i128,
    /// Price the walk must not pass, strictly on the side of travel
    pub sqrt_price_limit_x96: u128,
}

impl SwapParams {
    pub fn new(amount_specified: i128, sqrt_price_limit_x96: u128) -> Self {
        Self {
            amount_specified,
            sqrt_price_limit_x96,
        }
    }

    /// Moving toward higher ticks
    pub fn is_increasing(&self) -> bool {
        self.amount_specified > 0
    }
}

/// Trader-side settlement of a swap and the resulting market state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapResult {
    /// Fixed tokens credited to the trader
    pub quote_token_delta: i128,
    /// Base tokens credited to the trader
    pub base_token_delta: i128,
    pub sqrt_price_x96: u128,
    pub tick: i32,
    pub liquidity: u128,
    /// Initialized ticks crossed, in order of travel
    pub ticks_crossed: Vec<i32>,
}

/// Everything a swap will write, computed without touching storage
#[derive(Debug, Clone)]
pub struct SwapPlan {
    pub result: SwapResult,
    /// State after the swap; oracle fields are left for the caller
    pub state: VammState,
    /// Tick records after crossing, in order of travel
    pub crossed: Vec<(i32, TickInfo)>,
}

/// Running values of the walk
#[derive(Debug, Clone, Copy)]
struct SwapState {
    amount_remaining: i128,
    sqrt_price_x96: u128,
    tick: i32,
    liquidity: u128,
    growth: GrowthGlobals,
    /// Liquidity-provider side totals
    quote_lp: i128,
    base_lp: i128,
}

/// Inputs fixed for the duration of one swap
#[derive(Debug, Clone, Copy)]
pub struct SwapEnvironment {
    pub years_to_maturity: Decimal,
    pub rate_index: Decimal,
}

fn checked_add(a: i128, b: i128, operation: &'static str) -> VammResult<i128> {
    a.checked_add(b)
        .ok_or(VammError::ArithmeticOverflow { operation })
}

/// Reject limits on the wrong side of the price or outside the tick window
pub fn check_price_limit(
    state: &VammState,
    window: &VammMutableConfig,
    params: &SwapParams,
) -> VammResult<()> {
    let limit = params.sqrt_price_limit_x96;
    let valid = if params.is_increasing() {
        limit > state.sqrt_price_x96 && limit < sqrt_price_at_tick(window.max_tick)?
    } else {
        limit < state.sqrt_price_x96 && limit > sqrt_price_at_tick(window.min_tick)?
    };
    if !valid {
        return Err(VammError::InvalidPriceLimit {
            limit,
            current: state.sqrt_price_x96,
        });
    }
    Ok(())
}

/// Run the swap against a snapshot of the market
pub fn simulate_swap(
    state: &VammState,
    ticks: &TickRegistry,
    window: &VammMutableConfig,
    params: &SwapParams,
    env: &SwapEnvironment,
) -> VammResult<SwapPlan> {
    if params.amount_specified == 0 {
        return Err(VammError::ZeroAmount);
    }
    check_price_limit(state, window, params)?;

    let increasing = params.is_increasing();
    let limit = params.sqrt_price_limit_x96;

    let mut s = SwapState {
        amount_remaining: params.amount_specified,
        sqrt_price_x96: state.sqrt_price_x96,
        tick: state.tick,
        liquidity: state.liquidity,
        growth: state.growth_global,
        quote_lp: 0,
        base_lp: 0,
    };
    let mut crossed: Vec<(i32, TickInfo)> = Vec::new();

    while s.amount_remaining != 0 && s.sqrt_price_x96 != limit {
        let sqrt_price_start = s.sqrt_price_x96;

        let (found, found_initialized) =
            ticks.next_initialized_tick_within_one_word(s.tick, !increasing);
        let tick_next = found.clamp(window.min_tick, window.max_tick);
        let initialized = found_initialized && tick_next == found;
        let sqrt_price_next = sqrt_price_at_tick(tick_next)?;

        let target = if increasing {
            sqrt_price_next.min(limit)
        } else {
            sqrt_price_next.max(limit)
        };

        let step = compute_swap_step(s.sqrt_price_x96, target, s.liquidity, s.amount_remaining)?;
        let reached_target = step.sqrt_price_next_x96 == target;

        let base_lp = if increasing {
            let used = step.amount_in.min(s.amount_remaining.unsigned_abs());
            let used = i128::try_from(used).map_err(|_| VammError::ArithmeticOverflow {
                operation: "swap amount in",
            })?;
            s.amount_remaining -= used;
            used
        } else {
            let used = i128::try_from(step.amount_out).map_err(|_| VammError::ArithmeticOverflow {
                operation: "swap amount out",
            })?;
            s.amount_remaining += used;
            -used
        };

        if s.liquidity > 0 && base_lp != 0 {
            let (low, high) = if increasing {
                (sqrt_price_start, step.sqrt_price_next_x96)
            } else {
                (step.sqrt_price_next_x96, sqrt_price_start)
            };
            let (tick_low, tick_high) = covered_ticks(low, high)?;
            let quote_lp = VammMath::fixed_tokens_in_range(
                base_lp,
                tick_low,
                tick_high,
                env.years_to_maturity,
                env.rate_index,
            )?;

            let quote_growth = GrowthX128::from_delta(quote_lp, s.liquidity)?;
            let base_growth = GrowthX128::from_delta(base_lp, s.liquidity)?;
            s.growth.quote = s.growth.quote.wrapping_add(quote_growth);
            s.growth.base = s.growth.base.wrapping_add(base_growth);
            s.quote_lp = checked_add(s.quote_lp, quote_lp, "swap quote total")?;
            s.base_lp = checked_add(s.base_lp, base_lp, "swap base total")?;
        }

        trace!(
            tick_next,
            initialized,
            amount_in = step.amount_in,
            amount_out = step.amount_out,
            "Swap step"
        );

        if step.sqrt_price_next_x96 == sqrt_price_next {
            if initialized {
                let info = ticks.preview_cross(tick_next, &s.growth);
                let liquidity_net = if increasing {
                    info.liquidity_net
                } else {
                    -info.liquidity_net
                };
                s.liquidity = add_liquidity_delta(s.liquidity, liquidity_net)?;
                crossed.push((tick_next, info));
            }
            s.tick = if increasing { tick_next } else { tick_next - 1 };
        } else if step.sqrt_price_next_x96 != sqrt_price_start {
            s.tick = tick_at_sqrt_price(step.sqrt_price_next_x96)?;
        }
        s.sqrt_price_x96 = step.sqrt_price_next_x96;

        // stopped short of the target: what remains is below price resolution
        if !reached_target {
            break;
        }
    }

    let quote_token_delta = s
        .quote_lp
        .checked_neg()
        .ok_or(VammError::ArithmeticOverflow {
            operation: "trader quote delta",
        })?;
    let base_token_delta = s
        .base_lp
        .checked_neg()
        .ok_or(VammError::ArithmeticOverflow {
            operation: "trader base delta",
        })?;

    debug!(
        amount_specified = params.amount_specified,
        base_token_delta,
        quote_token_delta,
        tick_before = state.tick,
        tick_after = s.tick,
        ticks_crossed = crossed.len(),
        "Swap simulated"
    );

    let mut new_state = *state;
    new_state.sqrt_price_x96 = s.sqrt_price_x96;
    new_state.tick = s.tick;
    new_state.liquidity = s.liquidity;
    new_state.growth_global = s.growth;

    Ok(SwapPlan {
        result: SwapResult {
            quote_token_delta,
            base_token_delta,
            sqrt_price_x96: s.sqrt_price_x96,
            tick: s.tick,
            liquidity: s.liquidity,
            ticks_crossed: crossed.iter().map(|(tick, _)| *tick).collect(),
        },
        state: new_state,
        crossed,
    })
}

/// Ticks whose price intervals `[low, high]` traded through.
///
/// A step ending exactly on a tick boundary never traded inside that tick.
fn covered_ticks(low: u128, high: u128) -> VammResult<(i32, i32)> {
    let tick_low = tick_at_sqrt_price(low)?;
    let mut tick_high = tick_at_sqrt_price(high)?;
    if tick_high > tick_low && sqrt_price_at_tick(tick_high)? == high {
        tick_high -= 1;
    }
    Ok((tick_low, tick_high))
}
