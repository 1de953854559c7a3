//! Engine-side market configuration
//!
//! The immutable half is fixed at initialization. The mutable half (price
//! impact, spread and tradable tick window) can be replaced through
//! `Vamm::set_mutable_config`.

use crate::error::{VammError, VammResult};
use crate::tick::{check_tick_spacing, max_liquidity_per_tick};
use crate::tick_math::{MAX_TICK, MIN_TICK};
use ::config::MarketSettings;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::MarketId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VammImmutableConfig {
    pub market_id: MarketId,
    /// Unix seconds
    pub maturity_timestamp: u64,
    pub tick_spacing: i32,
    pub max_liquidity_per_tick: u128,
}

impl VammImmutableConfig {
    /// Config with the per-tick cap derived from `tick_spacing`
    pub fn new(
        market_id: MarketId,
        maturity_timestamp: u64,
        tick_spacing: i32,
    ) -> VammResult<Self> {
        if market_id.is_null() {
            return Err(VammError::InvalidConfig {
                reason: "market id must be non-zero".to_string(),
            });
        }
        check_tick_spacing(tick_spacing)?;
        Ok(Self {
            market_id,
            maturity_timestamp,
            tick_spacing,
            max_liquidity_per_tick: max_liquidity_per_tick(tick_spacing)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VammMutableConfig {
    /// Price-impact scale `phi` in `phi * |size|^beta`
    pub price_impact_phi: Decimal,
    pub price_impact_beta: Decimal,
    /// Added to (or subtracted from) the TWAP rate
    pub spread: Decimal,
    /// Lowest tick a swap may reach
    pub min_tick: i32,
    /// Highest tick a swap may reach
    pub max_tick: i32,
}

impl Default for VammMutableConfig {
    fn default() -> Self {
        Self {
            price_impact_phi: Decimal::ZERO,
            price_impact_beta: Decimal::ZERO,
            spread: Decimal::ZERO,
            min_tick: MIN_TICK,
            max_tick: MAX_TICK,
        }
    }
}

impl VammMutableConfig {
    pub fn validate(&self) -> VammResult<()> {
        if self.price_impact_phi.is_sign_negative()
            || self.price_impact_beta.is_sign_negative()
            || self.spread.is_sign_negative()
        {
            return Err(VammError::InvalidConfig {
                reason: "price impact and spread must be non-negative".to_string(),
            });
        }
        if self.min_tick < MIN_TICK || self.max_tick > MAX_TICK || self.min_tick >= self.max_tick {
            return Err(VammError::InvalidConfig {
                reason: format!(
                    "tick window [{}, {}] must be non-empty and inside [{}, {}]",
                    self.min_tick, self.max_tick, MIN_TICK, MAX_TICK
                ),
            });
        }
        Ok(())
    }

    pub fn contains_tick(&self, tick: i32) -> bool {
        (self.min_tick..=self.max_tick).contains(&tick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VammConfig {
    pub immutable: VammImmutableConfig,
    pub mutable: VammMutableConfig,
}

impl VammConfig {
    pub fn new(immutable: VammImmutableConfig, mutable: VammMutableConfig) -> VammResult<Self> {
        mutable.validate()?;
        Ok(Self { immutable, mutable })
    }

    /// Bridge from loaded settings
    pub fn from_settings(settings: &MarketSettings) -> VammResult<Self> {
        settings
            .validate()
            .map_err(|e| VammError::InvalidConfig {
                reason: format!("{e:#}"),
            })?;

        let immutable = VammImmutableConfig::new(
            settings.market_id,
            settings.maturity_timestamp,
            settings.tick_spacing,
        )?;
        let mutable = VammMutableConfig {
            price_impact_phi: settings.price_impact_phi,
            price_impact_beta: settings.price_impact_beta,
            spread: settings.spread,
            min_tick: settings.min_tick.unwrap_or(MIN_TICK),
            max_tick: settings.max_tick.unwrap_or(MAX_TICK),
        };
        Self::new(immutable, mutable)
    }
}
