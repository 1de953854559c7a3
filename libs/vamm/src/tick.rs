//! Tick registry: per-tick liquidity counters and growth-outside bookkeeping
//!
//! Ticks live in a sparse map keyed by tick index, mirrored by a
//! [`TickBitmap`] whose bit is set exactly when the tick holds liquidity.
//!
//! Mutations come in two halves. `preview_*` computes the new [`TickInfo`]
//! without touching storage and performs every check that can fail; `apply_*`
//! commits a preview and cannot fail. Callers that touch several ticks preview
//! all of them first so a failure leaves the registry untouched.

use crate::error::{VammError, VammResult};
use crate::tick_bitmap::TickBitmap;
use crate::tick_math::{check_tick, MAX_TICK, MIN_TICK};
use std::collections::HashMap;
use types::GrowthX128;

pub use ::config::defaults::market::MAX_TICK_SPACING;

/// Global growth accumulators, one per settlement token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GrowthGlobals {
    /// Fixed (quote) token growth per unit of liquidity
    pub quote: GrowthX128,
    /// Variable (base) token growth per unit of liquidity
    pub base: GrowthX128,
}

impl GrowthGlobals {
    pub fn wrapping_sub(self, rhs: Self) -> Self {
        Self {
            quote: self.quote.wrapping_sub(rhs.quote),
            base: self.base.wrapping_sub(rhs.base),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickInfo {
    /// Total liquidity referencing this tick as a boundary
    pub liquidity_gross: u128,
    /// Added to active liquidity when price crosses upward
    pub liquidity_net: i128,
    /// Growth on the side of this tick away from the current price
    pub growth_outside: GrowthGlobals,
    pub initialized: bool,
}

/// A previewed tick mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickUpdate {
    pub tick: i32,
    pub info: TickInfo,
    /// Whether the tick moved between initialized and uninitialized
    pub flipped: bool,
}

/// `current + delta` for liquidity, rejecting results below zero or above `u128::MAX`
pub fn add_liquidity_delta(current: u128, delta: i128) -> VammResult<u128> {
    if delta < 0 {
        current
            .checked_sub(delta.unsigned_abs())
            .ok_or(VammError::LiquidityUnderflow { current, delta })
    } else {
        current
            .checked_add(delta as u128)
            .ok_or(VammError::LiquidityOverflow { current, delta })
    }
}

/// Validate a position range against global bounds and spacing
pub fn check_ticks(tick_lower: i32, tick_upper: i32, tick_spacing: i32) -> VammResult<()> {
    if tick_lower >= tick_upper {
        return Err(VammError::InvalidTickRange {
            lower: tick_lower,
            upper: tick_upper,
        });
    }
    check_tick(tick_lower)?;
    check_tick(tick_upper)?;
    for tick in [tick_lower, tick_upper] {
        if tick % tick_spacing != 0 {
            return Err(VammError::TickNotAligned {
                tick,
                spacing: tick_spacing,
            });
        }
    }
    Ok(())
}

pub fn check_tick_spacing(tick_spacing: i32) -> VammResult<()> {
    if !(1..=MAX_TICK_SPACING).contains(&tick_spacing) {
        return Err(VammError::InvalidTickSpacing {
            spacing: tick_spacing,
        });
    }
    Ok(())
}

/// Per-tick liquidity cap: `u128::MAX` split evenly over every usable tick
pub fn max_liquidity_per_tick(tick_spacing: i32) -> VammResult<u128> {
    check_tick_spacing(tick_spacing)?;
    let min_tick = (MIN_TICK / tick_spacing) * tick_spacing;
    let max_tick = (MAX_TICK / tick_spacing) * tick_spacing;
    let num_ticks = ((max_tick - min_tick) / tick_spacing) as u128 + 1;
    Ok(u128::MAX / num_ticks)
}

/// Growth inside `[tick_lower, tick_upper)` from the two boundary records
pub fn growth_inside(
    lower: &TickInfo,
    upper: &TickInfo,
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
    globals: &GrowthGlobals,
) -> GrowthGlobals {
    let below = if tick_current >= tick_lower {
        lower.growth_outside
    } else {
        globals.wrapping_sub(lower.growth_outside)
    };
    let above = if tick_current < tick_upper {
        upper.growth_outside
    } else {
        globals.wrapping_sub(upper.growth_outside)
    };
    globals.wrapping_sub(below).wrapping_sub(above)
}

#[derive(Debug, Clone)]
pub struct TickRegistry {
    tick_spacing: i32,
    ticks: HashMap<i32, TickInfo>,
    bitmap: TickBitmap,
}

impl TickRegistry {
    pub fn new(tick_spacing: i32) -> VammResult<Self> {
        check_tick_spacing(tick_spacing)?;
        Ok(Self {
            tick_spacing,
            ticks: HashMap::new(),
            bitmap: TickBitmap::new(),
        })
    }

    pub fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    pub fn get(&self, tick: i32) -> Option<&TickInfo> {
        self.ticks.get(&tick)
    }

    /// Stored record, or the zero record for untouched ticks
    pub fn info(&self, tick: i32) -> TickInfo {
        self.ticks.get(&tick).copied().unwrap_or_default()
    }

    pub fn is_initialized(&self, tick: i32) -> bool {
        self.bitmap.is_initialized(tick, self.tick_spacing)
    }

    /// Number of ticks with stored state
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Stored ticks in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (i32, &TickInfo)> + '_ {
        let mut ticks: Vec<_> = self.ticks.iter().map(|(t, info)| (*t, info)).collect();
        ticks.sort_unstable_by_key(|(tick, _)| *tick);
        ticks.into_iter()
    }

    /// Compute the effect of adding `liquidity_delta` at a boundary tick
    pub fn preview_update(
        &self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        globals: &GrowthGlobals,
        upper: bool,
        max_liquidity: u128,
    ) -> VammResult<TickUpdate> {
        check_tick(tick)?;
        if tick % self.tick_spacing != 0 {
            return Err(VammError::TickNotAligned {
                tick,
                spacing: self.tick_spacing,
            });
        }

        let mut info = self.info(tick);
        if liquidity_delta == 0 {
            return Ok(TickUpdate {
                tick,
                info,
                flipped: false,
            });
        }
        let gross_before = info.liquidity_gross;
        let gross_after = add_liquidity_delta(gross_before, liquidity_delta)?;
        if gross_after > max_liquidity {
            return Err(VammError::MaxLiquidityPerTickExceeded {
                tick,
                requested: gross_after,
                max: max_liquidity,
            });
        }

        let flipped = (gross_after == 0) != (gross_before == 0);

        if gross_before == 0 {
            // all growth before initialization is assumed to happen below the tick
            if tick <= tick_current {
                info.growth_outside = *globals;
            }
        }

        info.liquidity_gross = gross_after;
        info.initialized = gross_after != 0;
        info.liquidity_net = if upper {
            info.liquidity_net.checked_sub(liquidity_delta)
        } else {
            info.liquidity_net.checked_add(liquidity_delta)
        }
        .ok_or(VammError::LiquidityOverflow {
            current: gross_before,
            delta: liquidity_delta,
        })?;

        Ok(TickUpdate {
            tick,
            info,
            flipped,
        })
    }

    /// Commit a previewed update, toggling the bitmap on a flip.
    ///
    /// A tick left without gross liquidity loses its stored record.
    pub fn apply_update(&mut self, update: TickUpdate) {
        if update.flipped {
            self.bitmap.flip_tick(update.tick, self.tick_spacing);
        }
        if update.info.liquidity_gross == 0 {
            self.clear(update.tick);
        } else {
            self.ticks.insert(update.tick, update.info);
        }
    }

    /// Preview and apply in one step; returns whether the tick flipped
    pub fn update(
        &mut self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        globals: &GrowthGlobals,
        upper: bool,
        max_liquidity: u128,
    ) -> VammResult<bool> {
        let update = self.preview_update(
            tick,
            tick_current,
            liquidity_delta,
            globals,
            upper,
            max_liquidity,
        )?;
        self.apply_update(update);
        Ok(update.flipped)
    }

    /// Record after price crosses `tick`: `outside = global - outside`
    pub fn preview_cross(&self, tick: i32, globals: &GrowthGlobals) -> TickInfo {
        let mut info = self.info(tick);
        info.growth_outside = globals.wrapping_sub(info.growth_outside);
        info
    }

    pub fn apply_cross(&mut self, tick: i32, info: TickInfo) {
        self.ticks.insert(tick, info);
    }

    /// Flip growth-outside for a crossed tick; returns its `liquidity_net`
    pub fn cross(&mut self, tick: i32, globals: &GrowthGlobals) -> i128 {
        let info = self.preview_cross(tick, globals);
        self.apply_cross(tick, info);
        info.liquidity_net
    }

    /// Drop a tick's storage once nothing references it
    fn clear(&mut self, tick: i32) {
        self.ticks.remove(&tick);
    }

    pub fn growth_inside(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        tick_current: i32,
        globals: &GrowthGlobals,
    ) -> GrowthGlobals {
        growth_inside(
            &self.info(tick_lower),
            &self.info(tick_upper),
            tick_lower,
            tick_upper,
            tick_current,
            globals,
        )
    }

    pub fn next_initialized_tick_within_one_word(&self, tick: i32, lte: bool) -> (i32, bool) {
        self.bitmap
            .next_initialized_tick_within_one_word(tick, self.tick_spacing, lte)
    }
}
