//! Engine facade for one `(market, maturity)` pair
//!
//! [`Vamm`] owns the state, tick registry, position ledger and oracle of a
//! single market. Every mutating call checks the authorization gate, takes
//! the state lock flag, computes its full effect on copies and commits only
//! after every check passed. A failed call leaves the market exactly as it
//! found it.

use crate::error::{VammError, VammResult};
use crate::oracle::Oracle;
use crate::position::{
    FilledBalances, Position, PositionKey, PositionLedger, UnfilledBalances, UnfilledBases,
};
use crate::state::VammState;
use crate::swap::{simulate_swap, SwapEnvironment, SwapParams, SwapResult};
use crate::tick::{add_liquidity_delta, check_ticks, growth_inside, TickRegistry};
use crate::tick_math::{price_at_tick, tick_at_sqrt_price};
use crate::traits::{CallContext, GatedAction};
use crate::vamm_config::{VammConfig, VammMutableConfig};
use crate::vamm_math::VammMath;
use ::config::defaults::market::CLOSE_BEFORE_MATURITY_SECS;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use tracing::{debug, info};
use types::{AccountId, MarketId};

/// Oracle timestamps are seconds modulo 2^32
fn block_timestamp(now: u64) -> u32 {
    (now & u64::from(u32::MAX)) as u32
}

#[derive(Debug, Clone)]
pub struct Vamm {
    config: VammConfig,
    state: VammState,
    ticks: TickRegistry,
    positions: PositionLedger,
    oracle: Oracle,
}

impl Vamm {
    /// Open a market at `sqrt_price_x96`
    pub fn initialize(
        config: VammConfig,
        sqrt_price_x96: u128,
        ctx: &CallContext<'_>,
    ) -> VammResult<Self> {
        let market_id = config.immutable.market_id;
        authorize(ctx, market_id, GatedAction::Initialize)?;
        config.mutable.validate()?;
        check_open(ctx.now, config.immutable.maturity_timestamp)?;

        let tick = tick_at_sqrt_price(sqrt_price_x96)?;
        if !config.mutable.contains_tick(tick) {
            return Err(VammError::TickOutOfBounds {
                tick,
                min: config.mutable.min_tick,
                max: config.mutable.max_tick,
            });
        }

        let ticks = TickRegistry::new(config.immutable.tick_spacing)?;
        let mut oracle = Oracle::new();
        let (cardinality, cardinality_next) = oracle.initialize(block_timestamp(ctx.now));

        info!(
            %market_id,
            maturity = config.immutable.maturity_timestamp,
            tick,
            tick_spacing = config.immutable.tick_spacing,
            "Initialized market"
        );

        Ok(Self {
            config,
            state: VammState::new(sqrt_price_x96, tick, cardinality, cardinality_next),
            ticks,
            positions: PositionLedger::new(),
            oracle,
        })
    }

    pub fn market_id(&self) -> MarketId {
        self.config.immutable.market_id
    }

    pub fn maturity_timestamp(&self) -> u64 {
        self.config.immutable.maturity_timestamp
    }

    pub fn config(&self) -> &VammConfig {
        &self.config
    }

    pub fn state(&self) -> &VammState {
        &self.state
    }

    pub fn ticks(&self) -> &TickRegistry {
        &self.ticks
    }

    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    pub fn position(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// Run `op` with the lock flag held; the flag is released on every path
    fn with_lock<T>(&mut self, op: impl FnOnce(&mut Self) -> VammResult<T>) -> VammResult<T> {
        if !self.state.unlocked {
            return Err(VammError::Locked {
                market_id: self.market_id(),
                maturity: self.maturity_timestamp(),
            });
        }
        self.state.unlocked = false;
        let result = op(self);
        self.state.unlocked = true;
        result
    }

    fn rate_index(&self, ctx: &CallContext<'_>) -> VammResult<Decimal> {
        let market_id = self.market_id();
        ctx.rate_index
            .current_index(market_id)
            .map_err(|e| VammError::RateIndexUnavailable {
                market_id,
                reason: format!("{e:#}"),
            })
    }

    /// Add (`liquidity_delta > 0`) or remove liquidity from `owner`'s range.
    ///
    /// Returns the base notional that entered (positive) or left (negative)
    /// the range.
    pub fn mint_or_burn(
        &mut self,
        ctx: &CallContext<'_>,
        owner: AccountId,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> VammResult<i128> {
        authorize(ctx, self.market_id(), GatedAction::MintOrBurn)?;
        self.with_lock(|vamm| {
            vamm.modify_position(ctx.now, owner, tick_lower, tick_upper, liquidity_delta)
        })
    }

    fn modify_position(
        &mut self,
        now: u64,
        owner: AccountId,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> VammResult<i128> {
        if liquidity_delta == 0 {
            return Err(VammError::ZeroAmount);
        }
        check_ticks(tick_lower, tick_upper, self.config.immutable.tick_spacing)?;
        check_open(now, self.maturity_timestamp())?;

        let state = self.state;
        let globals = state.growth_global;
        let max_liquidity = self.config.immutable.max_liquidity_per_tick;

        let lower = self.ticks.preview_update(
            tick_lower,
            state.tick,
            liquidity_delta,
            &globals,
            false,
            max_liquidity,
        )?;
        let upper = self.ticks.preview_update(
            tick_upper,
            state.tick,
            liquidity_delta,
            &globals,
            true,
            max_liquidity,
        )?;

        let inside = growth_inside(
            &lower.info,
            &upper.info,
            tick_lower,
            tick_upper,
            state.tick,
            &globals,
        );
        let key = PositionKey::new(owner, tick_lower, tick_upper);
        let mut position = self.positions.position(&key);
        position.propagate(inside)?;
        position.update_liquidity(liquidity_delta)?;

        let liquidity = if (tick_lower..tick_upper).contains(&state.tick) {
            add_liquidity_delta(state.liquidity, liquidity_delta)?
        } else {
            state.liquidity
        };
        let executed_base = VammMath::base_between_ticks(tick_lower, tick_upper, liquidity_delta)?;

        // commit
        self.ticks.apply_update(lower);
        self.ticks.apply_update(upper);
        self.positions.insert(key, position);
        self.state.liquidity = liquidity;

        debug!(
            market_id = %self.market_id(),
            %owner,
            tick_lower,
            tick_upper,
            liquidity_delta,
            executed_base,
            "Modified position"
        );
        Ok(executed_base)
    }

    /// Trade `params.amount_specified` base notional against the pool
    pub fn swap(&mut self, ctx: &CallContext<'_>, params: SwapParams) -> VammResult<SwapResult> {
        authorize(ctx, self.market_id(), GatedAction::Swap)?;
        self.with_lock(|vamm| {
            if params.amount_specified == 0 {
                return Err(VammError::ZeroAmount);
            }
            let maturity = vamm.maturity_timestamp();
            check_open(ctx.now, maturity)?;

            let env = SwapEnvironment {
                years_to_maturity: VammMath::years_until_maturity(ctx.now, maturity),
                rate_index: vamm.rate_index(ctx)?,
            };
            let window = &vamm.config.mutable;
            let plan = simulate_swap(&vamm.state, &vamm.ticks, window, &params, &env)?;

            // commit
            for (tick, info) in &plan.crossed {
                vamm.ticks.apply_cross(*tick, *info);
            }
            let mut state = plan.state;
            if state.tick != vamm.state.tick {
                let (index, cardinality) = vamm.oracle.write(
                    vamm.state.observation_index,
                    block_timestamp(ctx.now),
                    vamm.state.tick,
                    vamm.state.observation_cardinality,
                    vamm.state.observation_cardinality_next,
                );
                state.observation_index = index;
                state.observation_cardinality = cardinality;
            }
            vamm.state = state;

            debug!(
                market_id = %vamm.market_id(),
                tick = state.tick,
                liquidity = state.liquidity,
                "Committed swap"
            );
            Ok(plan.result)
        })
    }

    /// Mean tick over the last `seconds_ago` seconds, floored
    pub fn observe_mean_tick(&self, now: u64, seconds_ago: u32) -> VammResult<i32> {
        self.oracle.arithmetic_mean_tick(
            block_timestamp(now),
            seconds_ago,
            self.state.tick,
            self.state.observation_index,
            self.state.observation_cardinality,
        )
    }

    /// Time-weighted fixed rate as a decimal fraction (`0.05` is 5%).
    ///
    /// Price impact scales the rate by `1 ± phi * |order_size|^beta` and the
    /// spread shifts it by `± spread`, with the sign of `order_size`. The
    /// result never goes below zero.
    pub fn twap(
        &self,
        now: u64,
        seconds_ago: u32,
        order_size: i128,
        adjust_for_price_impact: bool,
        adjust_for_spread: bool,
    ) -> VammResult<Decimal> {
        if order_size == 0 && (adjust_for_price_impact || adjust_for_spread) {
            return Err(VammError::TwapNotAdjustable);
        }
        let overflow = || VammError::ArithmeticOverflow { operation: "twap" };

        let mean_tick = self.observe_mean_tick(now, seconds_ago)?;
        let mut rate = price_at_tick(mean_tick)?
            .checked_div(dec!(100))
            .ok_or_else(overflow)?;
        let mutable = &self.config.mutable;

        if adjust_for_price_impact {
            let size = order_size
                .checked_abs()
                .and_then(|size| Decimal::try_from_i128_with_scale(size, 0).ok())
                .ok_or_else(overflow)?;
            let impact = size
                .checked_powd(mutable.price_impact_beta)
                .and_then(|p| p.checked_mul(mutable.price_impact_phi))
                .ok_or_else(overflow)?;
            let factor = if order_size > 0 {
                Decimal::ONE.checked_add(impact)
            } else {
                Decimal::ONE.checked_sub(impact)
            }
            .ok_or_else(overflow)?;
            rate = rate.checked_mul(factor).ok_or_else(overflow)?;
        }
        if adjust_for_spread {
            rate = if order_size > 0 {
                rate.checked_add(mutable.spread)
            } else {
                rate.checked_sub(mutable.spread)
            }
            .ok_or_else(overflow)?;
        }
        Ok(rate.max(Decimal::ZERO))
    }

    fn position_growth_inside(&self, key: &PositionKey) -> crate::tick::GrowthGlobals {
        self.ticks.growth_inside(
            key.tick_lower,
            key.tick_upper,
            self.state.tick,
            &self.state.growth_global,
        )
    }

    /// Settled base and fixed tokens of `owner`, growth to date included
    pub fn account_filled_balances(&self, owner: AccountId) -> VammResult<FilledBalances> {
        self.positions
            .filled_balances(owner, |key| self.position_growth_inside(key))
    }

    /// Base notional of `owner` still open to takers on each side
    pub fn account_unfilled_bases(&self, owner: AccountId) -> VammResult<UnfilledBases> {
        self.positions.unfilled_bases(owner, self.state.tick)
    }

    /// Unfilled bases plus the fixed tokens each side would settle into
    pub fn account_unfilled_balances(
        &self,
        ctx: &CallContext<'_>,
        owner: AccountId,
    ) -> VammResult<UnfilledBalances> {
        let rate_index = self.rate_index(ctx)?;
        let years = VammMath::years_until_maturity(ctx.now, self.maturity_timestamp());
        self.positions
            .unfilled_balances(owner, self.state.tick, years, rate_index)
    }

    /// Raise the oracle's target capacity; returns the new target
    pub fn increase_observation_cardinality_next(
        &mut self,
        ctx: &CallContext<'_>,
        cardinality_next: u16,
    ) -> VammResult<u16> {
        authorize(ctx, self.market_id(), GatedAction::GrowObservations)?;
        self.with_lock(|vamm| {
            let current = vamm.state.observation_cardinality_next;
            let next = vamm.oracle.grow(current, cardinality_next)?;
            vamm.state.observation_cardinality_next = next;
            if next != current {
                let market_id = vamm.market_id();
                info!(%market_id, from = current, to = next, "Raised observation capacity");
            }
            Ok(next)
        })
    }

    /// Replace price impact, spread and tick window
    pub fn set_mutable_config(
        &mut self,
        ctx: &CallContext<'_>,
        mutable: VammMutableConfig,
    ) -> VammResult<()> {
        authorize(ctx, self.market_id(), GatedAction::Configure)?;
        self.with_lock(|vamm| {
            mutable.validate()?;
            if !mutable.contains_tick(vamm.state.tick) {
                return Err(VammError::InvalidConfig {
                    reason: format!(
                        "current tick {} outside new window [{}, {}]",
                        vamm.state.tick, mutable.min_tick, mutable.max_tick
                    ),
                });
            }
            vamm.config.mutable = mutable;
            info!(market_id = %vamm.market_id(), ?mutable, "Updated market config");
            Ok(())
        })
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut VammState {
        &mut self.state
    }
}

fn authorize(ctx: &CallContext<'_>, market_id: MarketId, action: GatedAction) -> VammResult<()> {
    if !ctx.gate.is_authorized(ctx.caller, action) {
        return Err(VammError::Unauthorized {
            account: ctx.caller,
            action,
        });
    }
    if action.blocked_when_paused() && ctx.gate.is_paused(market_id) {
        return Err(VammError::Paused { market_id });
    }
    Ok(())
}

fn check_open(now: u64, maturity_timestamp: u64) -> VammResult<()> {
    if now.saturating_add(CLOSE_BEFORE_MATURITY_SECS) >= maturity_timestamp {
        return Err(VammError::MarketClosed {
            now,
            maturity: maturity_timestamp,
        });
    }
    Ok(())
}
