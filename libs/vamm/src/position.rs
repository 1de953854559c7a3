//! Position ledger and growth accounting
//!
//! A position is `(owner, tick_lower, tick_upper)` plus its liquidity. Token
//! balances are settled lazily: each position remembers the growth inside its
//! range at its last touch, and [`Position::propagate`] credits
//! `(inside_now - inside_last) * liquidity` when it is touched again or
//! queried. Positions are never deleted; a fully burned position keeps its
//! accumulated balances.

use crate::error::{VammError, VammResult};
use crate::tick::{add_liquidity_delta, GrowthGlobals};
use crate::vamm_math::VammMath;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use types::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub owner: AccountId,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl PositionKey {
    pub fn new(owner: AccountId, tick_lower: i32, tick_upper: i32) -> Self {
        Self {
            owner,
            tick_lower,
            tick_upper,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub liquidity: u128,
    /// Growth inside the range at the last sync
    pub growth_inside_last: GrowthGlobals,
    /// Settled fixed tokens
    pub quote_accumulated: i128,
    /// Settled base tokens
    pub base_accumulated: i128,
}

impl Position {
    /// Credit growth accrued since the last sync and move the snapshot forward
    pub fn propagate(&mut self, growth_inside: GrowthGlobals) -> VammResult<()> {
        let delta = growth_inside.wrapping_sub(self.growth_inside_last);
        let quote = delta.quote.accrue(self.liquidity)?;
        let base = delta.base.accrue(self.liquidity)?;

        self.quote_accumulated = self
            .quote_accumulated
            .checked_add(quote)
            .ok_or(VammError::ArithmeticOverflow {
                operation: "position quote balance",
            })?;
        self.base_accumulated = self
            .base_accumulated
            .checked_add(base)
            .ok_or(VammError::ArithmeticOverflow {
                operation: "position base balance",
            })?;
        self.growth_inside_last = growth_inside;
        Ok(())
    }

    pub fn update_liquidity(&mut self, liquidity_delta: i128) -> VammResult<()> {
        self.liquidity = add_liquidity_delta(self.liquidity, liquidity_delta)?;
        Ok(())
    }
}

/// Settled balances of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilledBalances {
    pub base: i128,
    pub quote: i128,
}

/// Base notional still available to takers on each side of the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnfilledBases {
    /// Above the current tick, consumed when takers push the tick up
    pub long: u128,
    /// Below the current tick, consumed when takers push the tick down
    pub short: u128,
}

/// Unfilled base together with the fixed tokens it would settle into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnfilledBalances {
    pub long_base: u128,
    pub short_base: u128,
    /// Fixed tokens booked by the liquidity providers if the long side fills
    pub long_quote: i128,
    /// Fixed tokens booked by the liquidity providers if the short side fills
    pub short_quote: i128,
}

fn unsigned(amount: i128) -> VammResult<u128> {
    u128::try_from(amount).map_err(|_| VammError::ArithmeticOverflow {
        operation: "unfilled base",
    })
}

/// Sub-ranges of `[lower, upper]` below and above `tick_current`
fn split_range(
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
) -> (Option<(i32, i32)>, Option<(i32, i32)>) {
    let short = (tick_current > tick_lower).then(|| (tick_lower, tick_upper.min(tick_current)));
    let long = (tick_current < tick_upper).then(|| (tick_lower.max(tick_current), tick_upper));
    (short, long)
}

/// Split a position's notional around `tick_current`
pub fn unfilled_bases(
    key: &PositionKey,
    liquidity: u128,
    tick_current: i32,
) -> VammResult<UnfilledBases> {
    let liquidity = i128::try_from(liquidity).map_err(|_| VammError::ArithmeticOverflow {
        operation: "unfilled base",
    })?;
    let (short_range, long_range) = split_range(key.tick_lower, key.tick_upper, tick_current);

    let mut bases = UnfilledBases::default();
    if let Some((lower, upper)) = short_range {
        bases.short = unsigned(VammMath::base_between_ticks(lower, upper, liquidity)?)?;
    }
    if let Some((lower, upper)) = long_range {
        bases.long = unsigned(VammMath::base_between_ticks(lower, upper, liquidity)?)?;
    }
    Ok(bases)
}

#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: HashMap<PositionKey, Position>,
    by_owner: HashMap<AccountId, BTreeSet<(i32, i32)>>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// Stored position, or an empty one for a range never touched
    pub fn position(&self, key: &PositionKey) -> Position {
        self.positions.get(key).copied().unwrap_or_default()
    }

    pub fn insert(&mut self, key: PositionKey, position: Position) {
        self.by_owner
            .entry(key.owner)
            .or_default()
            .insert((key.tick_lower, key.tick_upper));
        self.positions.insert(key, position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Every position of `owner`, ordered by range
    pub fn owner_positions(
        &self,
        owner: AccountId,
    ) -> impl Iterator<Item = (PositionKey, &Position)> + '_ {
        self.by_owner
            .get(&owner)
            .into_iter()
            .flat_map(move |ranges| {
                ranges.iter().filter_map(move |&(tick_lower, tick_upper)| {
                    let key = PositionKey::new(owner, tick_lower, tick_upper);
                    self.positions.get(&key).map(|position| (key, position))
                })
            })
    }

    /// Settled balances of `owner` including growth not yet propagated.
    ///
    /// `growth_inside` supplies the current growth inside a range.
    pub fn filled_balances<F>(
        &self,
        owner: AccountId,
        mut growth_inside: F,
    ) -> VammResult<FilledBalances>
    where
        F: FnMut(&PositionKey) -> GrowthGlobals,
    {
        let mut total = FilledBalances::default();
        for (key, position) in self.owner_positions(owner) {
            let mut synced = *position;
            synced.propagate(growth_inside(&key))?;
            total.base = total
                .base
                .checked_add(synced.base_accumulated)
                .ok_or(VammError::ArithmeticOverflow {
                    operation: "filled base balance",
                })?;
            total.quote = total
                .quote
                .checked_add(synced.quote_accumulated)
                .ok_or(VammError::ArithmeticOverflow {
                    operation: "filled quote balance",
                })?;
        }
        Ok(total)
    }

    pub fn unfilled_bases(&self, owner: AccountId, tick_current: i32) -> VammResult<UnfilledBases> {
        let overflow = |operation| VammError::ArithmeticOverflow { operation };
        let mut total = UnfilledBases::default();
        for (key, position) in self.owner_positions(owner) {
            let bases = unfilled_bases(&key, position.liquidity, tick_current)?;
            let long = total.long.checked_add(bases.long);
            let short = total.short.checked_add(bases.short);
            total.long = long.ok_or_else(|| overflow("unfilled long"))?;
            total.short = short.ok_or_else(|| overflow("unfilled short"))?;
        }
        Ok(total)
    }

    /// Unfilled bases plus the fixed tokens each side settles into
    pub fn unfilled_balances(
        &self,
        owner: AccountId,
        tick_current: i32,
        years_to_maturity: Decimal,
        rate_index: Decimal,
    ) -> VammResult<UnfilledBalances> {
        let overflow = |operation| VammError::ArithmeticOverflow { operation };
        let (years, index) = (years_to_maturity, rate_index);
        let mut total = UnfilledBalances::default();

        for (key, position) in self.owner_positions(owner) {
            let bases = unfilled_bases(&key, position.liquidity, tick_current)?;
            let (short_range, long_range) =
                split_range(key.tick_lower, key.tick_upper, tick_current);

            if let Some((lower, upper)) = long_range {
                let base = i128::try_from(bases.long).map_err(|_| overflow("unfilled long"))?;
                let quote = VammMath::fixed_tokens_in_range(base, lower, upper, years, index)?;
                let sum = total.long_quote.checked_add(quote);
                total.long_quote = sum.ok_or_else(|| overflow("unfilled long"))?;
            }
            if let Some((lower, upper)) = short_range {
                let base = i128::try_from(bases.short).map_err(|_| overflow("unfilled short"))?;
                let quote = VammMath::fixed_tokens_in_range(-base, lower, upper, years, index)?;
                let sum = total.short_quote.checked_add(quote);
                total.short_quote = sum.ok_or_else(|| overflow("unfilled short"))?;
            }

            let long_base = total.long_base.checked_add(bases.long);
            let short_base = total.short_base.checked_add(bases.short);
            total.long_base = long_base.ok_or_else(|| overflow("unfilled long"))?;
            total.short_base = short_base.ok_or_else(|| overflow("unfilled short"))?;
        }
        Ok(total)
    }
}
