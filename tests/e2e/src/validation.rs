//! Structural invariant checks over a live market

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use vamm::Vamm;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub validator: String,
    pub passed: bool,
    pub message: String,
}

impl ValidationResult {
    fn from_check(validator: &str, check: Result<()>) -> Self {
        match check {
            Ok(()) => Self {
                validator: validator.to_string(),
                passed: true,
                message: "ok".to_string(),
            },
            Err(e) => Self {
                validator: validator.to_string(),
                passed: false,
                message: format!("{e:#}"),
            },
        }
    }
}

pub struct MarketValidator;

impl MarketValidator {
    /// Run every check; results are reported, not short-circuited
    pub fn validate(vamm: &Vamm) -> Vec<ValidationResult> {
        vec![
            ValidationResult::from_check("bitmap_matches_ticks", Self::check_bitmap(vamm)),
            ValidationResult::from_check("liquidity_net_sums_to_zero", Self::check_net_sum(vamm)),
            ValidationResult::from_check("active_liquidity", Self::check_active_liquidity(vamm)),
            ValidationResult::from_check("price_matches_tick", Self::check_price(vamm)),
        ]
    }

    /// A tick is stored and flagged exactly while it holds gross liquidity
    pub fn check_bitmap(vamm: &Vamm) -> Result<()> {
        let ticks = vamm.ticks();
        for (tick, info) in ticks.iter() {
            if info.liquidity_gross == 0 {
                bail!("tick {tick} stored with zero gross liquidity");
            }
            if !info.initialized || !ticks.is_initialized(tick) {
                bail!("tick {tick} holds liquidity but is not flagged initialized");
            }
        }
        Ok(())
    }

    pub fn check_net_sum(vamm: &Vamm) -> Result<()> {
        let sum: i128 = vamm.ticks().iter().map(|(_, info)| info.liquidity_net).sum();
        if sum != 0 {
            bail!("liquidity_net sums to {sum}");
        }
        Ok(())
    }

    /// Active liquidity equals the net of every tick at or below the current tick
    pub fn check_active_liquidity(vamm: &Vamm) -> Result<()> {
        let current = vamm.state().tick;
        let expected: i128 = vamm
            .ticks()
            .iter()
            .filter(|(tick, _)| *tick <= current)
            .map(|(_, info)| info.liquidity_net)
            .sum();
        if expected < 0 || expected as u128 != vamm.state().liquidity {
            bail!(
                "active liquidity {} but ticks at or below {} net to {}",
                vamm.state().liquidity,
                current,
                expected
            );
        }
        Ok(())
    }

    /// The current tick brackets the current price
    pub fn check_price(vamm: &Vamm) -> Result<()> {
        let state = vamm.state();
        let lower = vamm::sqrt_price_at_tick(state.tick)?;
        // the top tick has no upper neighbour; its price is the ceiling itself
        let upper = if state.tick == vamm::MAX_TICK {
            lower
        } else {
            vamm::sqrt_price_at_tick(state.tick + 1)?
        };
        if state.sqrt_price_x96 < lower || state.sqrt_price_x96 > upper {
            bail!(
                "price {} outside tick {} bounds [{}, {}]",
                state.sqrt_price_x96,
                state.tick,
                lower,
                upper
            );
        }
        Ok(())
    }
}
