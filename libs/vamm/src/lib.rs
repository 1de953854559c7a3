//! # Dated IRS Virtual AMM - Concentrated Liquidity Engine
//!
//! ## Purpose
//!
//! Pricing and liquidity engine for fixed-for-floating interest-rate swaps
//! with a fixed maturity. Liquidity providers commit base notional across tick
//! ranges, takers swap variable notional for fixed tokens, and every position
//! accrues its share of each trade through growth accounting without being
//! touched by the trade itself.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Market settings from `irs-config`, a variable-rate index
//!   through [`RateIndexSource`], authorization through [`AuthorizationGate`]
//! - **Output Destinations**: Settlement and margin layers reading
//!   [`SwapResult`], filled and unfilled account balances and TWAP rates
//! - **Price Scale**: `price = 1.0001^(-tick)` in percent, square-root prices in
//!   Q64.96 fixed point, ticks in `[-69100, 69100]`
//! - **Precision**: Integer fixed point for prices and growth, `Decimal` for
//!   rates, coefficients and the rate index
//!
//! ## Architecture Role
//!
//! ```text
//! VammPool ──(MarketId, maturity)──► Vamm
//!                                     ├── TickRegistry ── TickBitmap
//!                                     ├── PositionLedger
//!                                     ├── Oracle
//!                                     └── swap::simulate_swap ── swap_math, vamm_math, tick_math
//! ```
//!
//! All state for a market lives in one [`Vamm`]. Mutations are staged against
//! a snapshot and committed at the end, so a failed call never leaves a
//! partial write. The pool serializes callers with non-blocking locks.
//!
//! ## Performance Profile
//!
//! - **Swap**: one bitmap word lookup per step, steps bounded by initialized
//!   ticks between the start price and the limit
//! - **Mint/Burn**: O(1) in the number of ticks and positions
//! - **TWAP**: O(log cardinality) binary search over the observation buffer
//! - **Memory**: sparse tick and bitmap maps, observations grow on request only

pub mod error;
pub mod oracle;
pub mod pool;
pub mod position;
pub mod state;
pub mod swap;
pub mod swap_math;
pub mod tick;
pub mod tick_bitmap;
pub mod tick_math;
pub mod traits;
pub mod vamm;
pub mod vamm_config;
pub mod vamm_math;

pub use error::{ErrorClass, VammError, VammResult};
pub use oracle::{Observation, Oracle};
pub use pool::{MarketHandle, MarketKey, VammPool};
pub use position::{
    FilledBalances, Position, PositionKey, PositionLedger, UnfilledBalances, UnfilledBases,
};
pub use state::VammState;
pub use swap::{SwapParams, SwapResult};
pub use tick::{GrowthGlobals, TickInfo, TickRegistry};
pub use tick_math::{
    price_at_tick, sqrt_price_at_tick, tick_at_sqrt_price, MAX_SQRT_RATIO, MAX_TICK,
    MIN_SQRT_RATIO, MIN_TICK,
};
pub use traits::{
    AuthorizationGate, CallContext, FixedRateIndex, GatedAction, OpenGate, RateIndexSource,
};
pub use vamm::Vamm;
pub use vamm_config::{VammConfig, VammImmutableConfig, VammMutableConfig};
pub use vamm_math::{VammMath, SECONDS_IN_YEAR};

/// Common types for callers
pub use rust_decimal::Decimal;
pub use types::{AccountId, MarketId};
