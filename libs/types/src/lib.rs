//! # Dated IRS Shared Types
//!
//! Shared type system for the dated interest-rate-swap virtual AMM.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: Prices and growth accumulators stored as scaled integers
//! - **Type Safety**: Distinct id types prevent mixing accounts and markets
//! - **Explicit Wrap-Around**: Growth accumulators use modular 256-bit arithmetic
//!   instead of relying on silent integer overflow
//! - **Clear Boundaries**: Explicit conversion points between `Decimal` and fixed-point
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{mul_div, AccountId, GrowthX128, MarketId, U256};
//!
//! let trader = AccountId::new(7);
//! let market = MarketId::new(1);
//! assert_ne!(trader.inner(), 0);
//! assert_eq!(market.to_string(), "MarketId(1)");
//!
//! // Signed per-liquidity growth, accrued back into a token amount
//! let growth = GrowthX128::from_delta(-1_000, 1 << 20).unwrap();
//! assert_eq!(growth.accrue(1 << 20).unwrap(), -1_000);
//!
//! let q = mul_div(U256::from(10u8), U256::from(3u8), U256::from(4u8)).unwrap();
//! assert_eq!(q, U256::from(7u8));
//! ```
//!
//! ## Integration Points
//!
//! - **VAMM engine**: tick math, swap math and growth accounting
//! - **Configuration**: market identifiers in TOML market tables
//! - **Scenario runner**: account and market fixtures

#[cfg(feature = "common")]
pub mod common;

// Re-export common types for convenience
#[cfg(feature = "common")]
pub use common::errors::{FixedPointError, ValidationError};
#[cfg(feature = "common")]
pub use common::fixed_point::{
    decimal_to_i128, div_rounding_up, mul_div, mul_div_rounding_up, narrow_u128, GrowthX128,
    Q96, Q96_U256, RESOLUTION,
};
#[cfg(feature = "common")]
pub use common::identifiers::{AccountId, MarketId};

pub use primitive_types::{U256, U512};
