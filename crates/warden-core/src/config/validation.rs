//! Configuration validation

use super::model::{LoggingConfig, RateLimitSettings, WardenConfig};
use crate::error::{WardenError, WardenResult};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

/// Validate every section, returning the first problem found
pub fn validate_config(config: &WardenConfig) -> WardenResult<()> {
    config.failover.validate()?;
    validate_rate_limit(&config.rate_limit)?;
    config.spending.validate()?;
    validate_logging(&config.logging)
}

fn validate_rate_limit(settings: &RateLimitSettings) -> WardenResult<()> {
    if settings.store_timeout.is_zero() {
        return Err(WardenError::config("store timeout must be positive"));
    }
    if settings.max_entries == 0 {
        return Err(WardenError::config(
            "rate limit table capacity must be at least 1",
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> WardenResult<()> {
    if !LOG_LEVELS.contains(&logging.level.as_str()) {
        return Err(WardenError::config_with_context(
            format!("Unknown log level '{}'", logging.level),
            format!("expected one of {}", LOG_LEVELS.join(", ")),
        ));
    }
    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        return Err(WardenError::config_with_context(
            format!("Unknown log format '{}'", logging.format),
            format!("expected one of {}", LOG_FORMATS.join(", ")),
        ));
    }
    Ok(())
}
