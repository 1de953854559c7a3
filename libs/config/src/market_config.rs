//! Market Configuration Module
//!
//! Provides configuration loading and validation for virtual AMM markets.
//! Supports loading from TOML files with environment-specific overrides.

use crate::defaults::{loader, logging, market};
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use types::MarketId;

/// Main settings structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct VammSettings {
    /// Global settings
    #[serde(default)]
    pub global: GlobalSettings,

    /// One entry per `(market, maturity)` pair
    #[serde(default)]
    pub markets: Vec<MarketSettings>,
}

/// Global settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GlobalSettings {
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
}

/// Settings for a single dated market
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MarketSettings {
    pub market_id: MarketId,
    /// Unix seconds
    pub maturity_timestamp: u64,
    #[serde(default = "default_tick_spacing")]
    pub tick_spacing: i32,
    /// Opening tick; the engine starts at its exact square-root price
    pub initial_tick: i32,
    #[serde(default)]
    pub price_impact_phi: Decimal,
    #[serde(default)]
    pub price_impact_beta: Decimal,
    #[serde(default)]
    pub spread: Decimal,
    /// Tradable window, defaults to the global tick bounds
    pub min_tick: Option<i32>,
    pub max_tick: Option<i32>,
    #[serde(default = "default_cardinality_next")]
    pub observation_cardinality_next: u16,
}

fn default_tick_spacing() -> i32 {
    market::DEFAULT_TICK_SPACING
}

fn default_cardinality_next() -> u16 {
    market::DEFAULT_OBSERVATION_CARDINALITY_NEXT
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_level: logging::DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

impl MarketSettings {
    /// Settings with default spacing, no price impact and no spread
    pub fn new(market_id: MarketId, maturity_timestamp: u64, initial_tick: i32) -> Self {
        Self {
            market_id,
            maturity_timestamp,
            tick_spacing: market::DEFAULT_TICK_SPACING,
            initial_tick,
            price_impact_phi: Decimal::ZERO,
            price_impact_beta: Decimal::ZERO,
            spread: Decimal::ZERO,
            min_tick: None,
            max_tick: None,
            observation_cardinality_next: market::DEFAULT_OBSERVATION_CARDINALITY_NEXT,
        }
    }

    /// Structural checks that do not depend on engine tick bounds
    pub fn validate(&self) -> Result<()> {
        MarketId::new_validated(self.market_id.inner()).context("market_id must be non-zero")?;

        if self.maturity_timestamp == 0 {
            bail!("{}: maturity_timestamp must be set", self.market_id);
        }
        if !(1..=market::MAX_TICK_SPACING).contains(&self.tick_spacing) {
            bail!(
                "{}: tick_spacing {} outside [1, {}]",
                self.market_id,
                self.tick_spacing,
                market::MAX_TICK_SPACING
            );
        }
        if self.price_impact_phi.is_sign_negative()
            || self.price_impact_beta.is_sign_negative()
            || self.spread.is_sign_negative()
        {
            bail!(
                "{}: price impact and spread must be non-negative",
                self.market_id
            );
        }
        if let (Some(min), Some(max)) = (self.min_tick, self.max_tick) {
            if min >= max {
                bail!(
                    "{}: min_tick {} must be below max_tick {}",
                    self.market_id,
                    min,
                    max
                );
            }
        }
        if self.observation_cardinality_next == 0 {
            bail!(
                "{}: observation_cardinality_next must be at least 1",
                self.market_id
            );
        }
        Ok(())
    }
}

impl VammSettings {
    /// Load settings from files with environment overrides
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let base = base_path.unwrap_or(Path::new(loader::DEFAULT_CONFIG_PATH));

        let mut builder = Config::builder().add_source(File::from(base).required(true));

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or(Path::new("."))
                .join(loader::ENVIRONMENTS_DIR)
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (VAMM_ prefix)
        builder = builder.add_source(
            Environment::with_prefix(loader::ENV_PREFIX)
                .prefix_separator("_")
                .separator(loader::ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let settings: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        settings.validate()?;

        debug!(markets = settings.markets.len(), "Loaded VAMM settings");
        Ok(settings)
    }

    /// Parse settings from an in-memory TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).context("Failed to parse TOML settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate every market and reject duplicate `(market, maturity)` pairs
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for market in &self.markets {
            market.validate()?;
            if !seen.insert((market.market_id, market.maturity_timestamp)) {
                bail!(
                    "Duplicate market {} with maturity {}",
                    market.market_id,
                    market.maturity_timestamp
                );
            }
        }
        Ok(())
    }

    /// Settings for a specific market and maturity
    pub fn get_market(&self, market_id: MarketId, maturity: u64) -> Option<&MarketSettings> {
        self.markets
            .iter()
            .find(|m| m.market_id == market_id && m.maturity_timestamp == maturity)
    }
}

/// Convenience function to load settings, expanding `~` and `$VARS` in the path
pub fn load_settings(path: Option<&str>, environment: Option<&str>) -> Result<VammSettings> {
    let path = path.unwrap_or(loader::DEFAULT_CONFIG_PATH);
    let expanded = shellexpand::full(path).context("Failed to expand config path")?;
    VammSettings::load(Some(&PathBuf::from(expanded.as_ref())), environment)
}
