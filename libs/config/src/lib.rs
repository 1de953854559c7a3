//! # Dated IRS Market Configuration
//!
//! Configuration management and defaults for virtual AMM markets.
//!
//! ## Features
//!
//! - **Market Settings**: maturity, tick spacing, opening tick, price-impact
//!   coefficients and spread per `(market, maturity)` pair
//! - **Layered Loading**: base TOML file, per-environment override file and
//!   `VAMM_*` environment variables
//! - **Defaults**: tick spacing, oracle capacity and default config locations
//! - **Logging**: one-call `tracing` subscriber setup for binaries
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::{init_tracing, VammSettings};
//!
//! let settings = VammSettings::load(None, Some("staging"))?;
//! init_tracing(&settings.global)?;
//! for market in &settings.markets {
//!     println!("{} matures at {}", market.market_id, market.maturity_timestamp);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod defaults;
pub mod logging;
pub mod market_config;

// Re-export commonly used types
pub use logging::init_tracing;
pub use market_config::{load_settings, GlobalSettings, MarketSettings, VammSettings};
