//! Registry of markets keyed by `(market, maturity)`
//!
//! Each market sits behind its own `parking_lot::RwLock`. Entry points only
//! ever `try_*` that lock: a caller that finds a market busy gets
//! [`VammError::Locked`] back immediately instead of waiting.

use crate::error::{VammError, VammResult};
use crate::position::{FilledBalances, UnfilledBalances, UnfilledBases};
use crate::swap::{SwapParams, SwapResult};
use crate::tick_math::sqrt_price_at_tick;
use crate::traits::CallContext;
use crate::vamm::Vamm;
use crate::vamm_config::{VammConfig, VammMutableConfig};
use ::config::MarketSettings;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use types::{AccountId, MarketId};

/// Registry key
pub type MarketKey = (MarketId, u64);

/// Shared handle to one market
pub type MarketHandle = Arc<RwLock<Vamm>>;

#[derive(Debug, Default)]
pub struct VammPool {
    markets: RwLock<HashMap<MarketKey, MarketHandle>>,
}

impl VammPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.read().is_empty()
    }

    /// Registered keys, sorted
    pub fn market_keys(&self) -> Vec<MarketKey> {
        let mut keys: Vec<_> = self.markets.read().keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Initialize and register a market
    pub fn create_market(
        &self,
        ctx: &CallContext<'_>,
        config: VammConfig,
        sqrt_price_x96: u128,
    ) -> VammResult<MarketHandle> {
        let key = (config.immutable.market_id, config.immutable.maturity_timestamp);
        let exists = || VammError::MarketAlreadyExists {
            market_id: key.0,
            maturity: key.1,
        };
        if self.markets.read().contains_key(&key) {
            return Err(exists());
        }

        // the registry lock is not held while collaborators run
        let vamm = Vamm::initialize(config, sqrt_price_x96, ctx)?;

        let mut markets = self.markets.write();
        let handle = match markets.entry(key) {
            Entry::Occupied(_) => return Err(exists()),
            Entry::Vacant(slot) => Arc::clone(slot.insert(Arc::new(RwLock::new(vamm)))),
        };
        info!(market_id = %key.0, maturity = key.1, total = markets.len(), "Registered market");
        Ok(handle)
    }

    /// Create a market from loaded settings, then apply its oracle capacity
    pub fn create_from_settings(
        &self,
        ctx: &CallContext<'_>,
        settings: &MarketSettings,
    ) -> VammResult<MarketHandle> {
        let config = VammConfig::from_settings(settings)?;
        let sqrt_price_x96 = sqrt_price_at_tick(settings.initial_tick)?;
        let handle = self.create_market(ctx, config, sqrt_price_x96)?;
        if settings.observation_cardinality_next > 1 {
            self.increase_observation_cardinality_next(
                ctx,
                (settings.market_id, settings.maturity_timestamp),
                settings.observation_cardinality_next,
            )?;
        }
        Ok(handle)
    }

    pub fn market(&self, market_id: MarketId, maturity: u64) -> VammResult<MarketHandle> {
        self.markets
            .read()
            .get(&(market_id, maturity))
            .cloned()
            .ok_or(VammError::MarketNotFound {
                market_id,
                maturity,
            })
    }

    /// Run `op` with exclusive access to one market
    pub fn with_market_mut<T>(
        &self,
        market_id: MarketId,
        maturity: u64,
        op: impl FnOnce(&mut Vamm) -> VammResult<T>,
    ) -> VammResult<T> {
        let handle = self.market(market_id, maturity)?;
        let mut vamm = handle
            .try_write()
            .ok_or(VammError::Locked {
                market_id,
                maturity,
            })?;
        op(&mut vamm)
    }

    /// Run `op` with shared access to one market
    pub fn with_market<T>(
        &self,
        market_id: MarketId,
        maturity: u64,
        op: impl FnOnce(&Vamm) -> VammResult<T>,
    ) -> VammResult<T> {
        let handle = self.market(market_id, maturity)?;
        let vamm = handle.try_read().ok_or_else(|| {
            warn!(%market_id, maturity, "Rejected read on busy market");
            VammError::Locked {
                market_id,
                maturity,
            }
        })?;
        op(&vamm)
    }

    pub fn mint_or_burn(
        &self,
        ctx: &CallContext<'_>,
        key: MarketKey,
        owner: AccountId,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> VammResult<i128> {
        self.with_market_mut(key.0, key.1, |vamm| {
            vamm.mint_or_burn(ctx, owner, tick_lower, tick_upper, liquidity_delta)
        })
        .inspect_err(|e| log_rejection(key, "mint_or_burn", e))
    }

    pub fn swap(
        &self,
        ctx: &CallContext<'_>,
        key: MarketKey,
        params: SwapParams,
    ) -> VammResult<SwapResult> {
        self.with_market_mut(key.0, key.1, |vamm| vamm.swap(ctx, params))
            .inspect_err(|e| log_rejection(key, "swap", e))
    }

    pub fn twap(
        &self,
        now: u64,
        key: MarketKey,
        seconds_ago: u32,
        order_size: i128,
        adjust_for_price_impact: bool,
        adjust_for_spread: bool,
    ) -> VammResult<Decimal> {
        self.with_market(key.0, key.1, |vamm| {
            vamm.twap(
                now,
                seconds_ago,
                order_size,
                adjust_for_price_impact,
                adjust_for_spread,
            )
        })
    }

    pub fn account_filled_balances(
        &self,
        key: MarketKey,
        owner: AccountId,
    ) -> VammResult<FilledBalances> {
        self.with_market(key.0, key.1, |vamm| vamm.account_filled_balances(owner))
    }

    pub fn account_unfilled_bases(
        &self,
        key: MarketKey,
        owner: AccountId,
    ) -> VammResult<UnfilledBases> {
        self.with_market(key.0, key.1, |vamm| vamm.account_unfilled_bases(owner))
    }

    pub fn account_unfilled_balances(
        &self,
        ctx: &CallContext<'_>,
        key: MarketKey,
        owner: AccountId,
    ) -> VammResult<UnfilledBalances> {
        self.with_market(key.0, key.1, |vamm| {
            vamm.account_unfilled_balances(ctx, owner)
        })
    }

    pub fn increase_observation_cardinality_next(
        &self,
        ctx: &CallContext<'_>,
        key: MarketKey,
        cardinality_next: u16,
    ) -> VammResult<u16> {
        self.with_market_mut(key.0, key.1, |vamm| {
            vamm.increase_observation_cardinality_next(ctx, cardinality_next)
        })
        .inspect_err(|e| {
            log_rejection(key, "increase_observation_cardinality_next", e)
        })
    }

    pub fn set_mutable_config(
        &self,
        ctx: &CallContext<'_>,
        key: MarketKey,
        mutable: VammMutableConfig,
    ) -> VammResult<()> {
        self.with_market_mut(key.0, key.1, |vamm| vamm.set_mutable_config(ctx, mutable))
            .inspect_err(|e| log_rejection(key, "set_mutable_config", e))
    }
}

fn log_rejection(key: MarketKey, operation: &'static str, error: &VammError) {
    if error.is_precondition() {
        warn!(market_id = %key.0, maturity = key.1, operation, %error, "Call rejected");
    } else {
        let class = error.class();
        warn!(market_id = %key.0, maturity = key.1, operation, %error, ?class, "Call failed");
    }
}
