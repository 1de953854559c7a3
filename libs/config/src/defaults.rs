//! Market configuration defaults
//!
//! Default values and constants shared by the loader, the engine bridge and
//! the scenario runner.

/// Tick and price defaults
pub mod market {
    /// Tick spacing used when a market does not set one
    pub const DEFAULT_TICK_SPACING: i32 = 60;

    /// Largest accepted tick spacing
    pub const MAX_TICK_SPACING: i32 = 16_384;

    /// Target oracle capacity requested right after initialization
    pub const DEFAULT_OBSERVATION_CARDINALITY_NEXT: u16 = 1;

    /// Trading stops this many seconds before maturity
    pub const CLOSE_BEFORE_MATURITY_SECS: u64 = 86_400;
}

/// Loader defaults
pub mod loader {
    /// Base settings file when no path is given
    pub const DEFAULT_CONFIG_PATH: &str = "config/vamm.toml";

    /// Directory (relative to the base file) holding `<env>.toml` overrides
    pub const ENVIRONMENTS_DIR: &str = "environments";

    /// Environment variable prefix (`VAMM_GLOBAL__LOG_LEVEL=debug`)
    pub const ENV_PREFIX: &str = "VAMM";

    /// Separator between nested keys in environment variables
    pub const ENV_SEPARATOR: &str = "__";
}

/// Logging defaults
pub mod logging {
    /// Filter used when neither `RUST_LOG` nor settings provide one
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}
