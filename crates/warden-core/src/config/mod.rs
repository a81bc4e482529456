//! Configuration
//!
//! Sources, later wins: built-in defaults, an optional TOML (or JSON)
//! file, then `WARDEN_*` environment variables. The circuit breaker's
//! failure threshold and recovery timeout are constants and not
//! configurable.

mod env_loader;
mod file_loader;
mod model;
mod validation;


pub use env_loader::{apply_overrides, load_from_env};
pub use file_loader::load_from_file;
pub use model::{LoggingConfig, RateLimitSettings, WardenConfig};
pub use validation::validate_config;

pub mod env {
    //! Names of the environment variables read by [`super::load_from_env`]
    pub use super::env_loader::{
        BLOCK_ON_SPEND_LIMIT, DAILY_SPEND_LIMIT_USD, FAILOVER_ENABLED, FAILOVER_TIMEOUT_MS,
        HOURLY_SPEND_LIMIT_USD, LOG_FORMAT, LOG_LEVEL, PROVIDER_ORDER, RATE_LIMIT_FAIL_CLOSED,
        RATE_LIMIT_MAX_ENTRIES, SPEND_WARNING_THRESHOLD, STORE_TIMEOUT_MS,
    };
}

use crate::error::WardenResult;
use std::path::Path;

impl WardenConfig {
    /// Defaults overlaid with a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> WardenResult<Self> {
        load_from_file(path.as_ref())
    }

    /// Defaults overlaid with the process environment
    pub fn load_from_env() -> WardenResult<Self> {
        load_from_env()
    }

    /// Resolve every source in order and validate the result
    pub fn load(path: Option<&Path>) -> WardenResult<Self> {
        let mut config = match path {
            Some(path) => load_from_file(path)?,
            None => Self::default(),
        };
        apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WardenResult<()> {
        validate_config(self)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> WardenResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
