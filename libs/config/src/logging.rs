//! Tracing subscriber setup for binaries
//!
//! `RUST_LOG` wins over the configured level so operators can raise verbosity
//! for one run without editing settings.

use crate::market_config::GlobalSettings;
use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(settings: &GlobalSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .with_context(|| format!("Invalid log level: {}", settings.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if settings.json_logs {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    installed.context("Failed to install tracing subscriber")
}
