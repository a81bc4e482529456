//! Environment variable overrides

use super::model::WardenConfig;
use crate::error::{WardenError, WardenResult};
use std::str::FromStr;
use std::time::Duration;

pub const FAILOVER_ENABLED: &str = "WARDEN_FAILOVER_ENABLED";
pub const PROVIDER_ORDER: &str = "WARDEN_PROVIDER_ORDER";
pub const FAILOVER_TIMEOUT_MS: &str = "WARDEN_FAILOVER_TIMEOUT_MS";
pub const RATE_LIMIT_FAIL_CLOSED: &str = "WARDEN_RATE_LIMIT_FAIL_CLOSED";
pub const STORE_TIMEOUT_MS: &str = "WARDEN_STORE_TIMEOUT_MS";
pub const RATE_LIMIT_MAX_ENTRIES: &str = "WARDEN_RATE_LIMIT_MAX_ENTRIES";
pub const HOURLY_SPEND_LIMIT_USD: &str = "WARDEN_HOURLY_SPEND_LIMIT_USD";
pub const DAILY_SPEND_LIMIT_USD: &str = "WARDEN_DAILY_SPEND_LIMIT_USD";
pub const SPEND_WARNING_THRESHOLD: &str = "WARDEN_SPEND_WARNING_THRESHOLD";
pub const BLOCK_ON_SPEND_LIMIT: &str = "WARDEN_BLOCK_ON_SPEND_LIMIT";
pub const LOG_LEVEL: &str = "WARDEN_LOG_LEVEL";
pub const LOG_FORMAT: &str = "WARDEN_LOG_FORMAT";

/// Defaults with `WARDEN_*` process environment variables applied
pub fn load_from_env() -> WardenResult<WardenConfig> {
    let mut config = WardenConfig::default();
    apply_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Apply overrides read through `lookup`.
///
/// Unset and blank variables leave the current value alone; unparsable
/// values are configuration errors.
pub fn apply_overrides<F>(config: &mut WardenConfig, lookup: F) -> WardenResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(value) = var(FAILOVER_ENABLED) {
        config.failover.enabled = parse_bool(FAILOVER_ENABLED, &value)?;
    }
    if let Some(value) = var(PROVIDER_ORDER) {
        config.failover.providers = value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(value) = var(FAILOVER_TIMEOUT_MS) {
        config.failover.call_timeout = Some(parse_millis(FAILOVER_TIMEOUT_MS, &value)?);
    }

    if let Some(value) = var(RATE_LIMIT_FAIL_CLOSED) {
        config.rate_limit.fail_closed = parse_bool(RATE_LIMIT_FAIL_CLOSED, &value)?;
    }
    if let Some(value) = var(STORE_TIMEOUT_MS) {
        config.rate_limit.store_timeout = parse_millis(STORE_TIMEOUT_MS, &value)?;
    }
    if let Some(value) = var(RATE_LIMIT_MAX_ENTRIES) {
        config.rate_limit.max_entries = parse(RATE_LIMIT_MAX_ENTRIES, &value)?;
    }

    if let Some(value) = var(HOURLY_SPEND_LIMIT_USD) {
        config.spending.hourly_limit_usd = parse(HOURLY_SPEND_LIMIT_USD, &value)?;
    }
    if let Some(value) = var(DAILY_SPEND_LIMIT_USD) {
        config.spending.daily_limit_usd = parse(DAILY_SPEND_LIMIT_USD, &value)?;
    }
    if let Some(value) = var(SPEND_WARNING_THRESHOLD) {
        config.spending.warning_threshold = parse(SPEND_WARNING_THRESHOLD, &value)?;
    }
    if let Some(value) = var(BLOCK_ON_SPEND_LIMIT) {
        config.spending.block_on_limit = parse_bool(BLOCK_ON_SPEND_LIMIT, &value)?;
    }

    if let Some(value) = var(LOG_LEVEL) {
        config.logging.level = value.trim().to_lowercase();
    }
    if let Some(value) = var(LOG_FORMAT) {
        config.logging.format = value.trim().to_lowercase();
    }

    Ok(())
}

fn parse<T: FromStr>(name: &str, value: &str) -> WardenResult<T> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

fn parse_millis(name: &str, value: &str) -> WardenResult<Duration> {
    parse::<u64>(name, value).map(Duration::from_millis)
}

fn parse_bool(name: &str, value: &str) -> WardenResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn invalid(name: &str, value: &str) -> WardenError {
    WardenError::config_with_context(
        format!("Invalid {} value", name),
        format!("Parsing environment value '{}'", value),
    )
}
