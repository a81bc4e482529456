//! Configuration model

use crate::cache::DEFAULT_CAPACITY;
use crate::failover::FailoverConfig;
use crate::recovery::spending::SpendingConfig;
use crate::store::DEFAULT_STORE_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the resilience layer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub failover: FailoverConfig,
    pub rate_limit: RateLimitSettings,
    pub spending: SpendingConfig,
    pub logging: LoggingConfig,
}

/// Settings shared by every rate limiter the layer creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Reject requests when the shared store fails instead of falling back
    pub fail_closed: bool,
    /// Deadline for each shared store call
    #[serde(with = "humantime_serde")]
    pub store_timeout: Duration,
    /// Capacity of each in-memory identifier table
    pub max_entries: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            fail_closed: false,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            max_entries: DEFAULT_CAPACITY,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, compact, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
