//! Per-market engine state

use crate::tick::GrowthGlobals;

/// Current price, active liquidity, growth and oracle cursor of one market
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VammState {
    pub sqrt_price_x96: u128,
    /// Greatest tick whose price is at or below `sqrt_price_x96`
    pub tick: i32,
    /// Liquidity of positions whose range contains `tick`
    pub liquidity: u128,
    pub growth_global: GrowthGlobals,
    /// Cleared while a mutating call is in progress
    pub unlocked: bool,
    pub observation_index: u16,
    pub observation_cardinality: u16,
    pub observation_cardinality_next: u16,
}

impl VammState {
    pub fn new(sqrt_price_x96: u128, tick: i32, cardinality: u16, cardinality_next: u16) -> Self {
        Self {
            sqrt_price_x96,
            tick,
            liquidity: 0,
            growth_global: GrowthGlobals::default(),
            unlocked: true,
            observation_index: 0,
            observation_cardinality: cardinality,
            observation_cardinality_next: cardinality_next,
        }
    }
}
