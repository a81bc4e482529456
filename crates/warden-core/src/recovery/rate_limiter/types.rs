//! Type definitions for rate limiting

use crate::error::{WardenError, WardenResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one logical limiter (one route or feature).
///
/// # Examples
///
/// ```ignore
/// use warden_core::recovery::rate_limiter::RateLimitConfig;
///
/// // Preset for the chat route
/// let chat = RateLimitConfig::chat();
///
/// // Custom configuration
/// let custom = RateLimitConfig::new("search", 30, Duration::from_secs(60))
///     .with_burst_interval(Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Key namespace, keeps limiters sharing a store apart
    pub prefix: String,

    /// Requests allowed per window
    pub max_requests: u32,

    /// Fixed window length
    #[serde(with = "humantime_serde")]
    pub window: Duration,

    /// Minimum spacing between consecutive requests from one identifier
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub burst_interval: Option<Duration>,
}

impl RateLimitConfig {
    pub fn new(prefix: impl Into<String>, max_requests: u32, window: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            max_requests,
            window,
            burst_interval: None,
        }
    }

    /// Set the minimum spacing between requests
    pub fn with_burst_interval(mut self, interval: Duration) -> Self {
        self.burst_interval = Some(interval);
        self
    }

    /// Chat completions: 20 per minute, at most one every 2 seconds
    pub fn chat() -> Self {
        Self::new("chat", 20, Duration::from_secs(60)).with_burst_interval(Duration::from_secs(2))
    }

    /// General API traffic: 60 per minute
    pub fn api() -> Self {
        Self::new("api", 60, Duration::from_secs(60))
    }

    /// Authentication attempts: 5 per 15 minutes
    pub fn auth() -> Self {
        Self::new("auth", 5, Duration::from_secs(15 * 60))
    }

    pub fn validate(&self) -> WardenResult<()> {
        if self.prefix.trim().is_empty() {
            return Err(WardenError::config("rate limit prefix must not be empty"));
        }
        if self.max_requests == 0 {
            return Err(WardenError::config_with_context(
                "rate limit max_requests must be at least 1",
                format!("limiter '{}'", self.prefix),
            ));
        }
        if self.window.is_zero() {
            return Err(WardenError::config_with_context(
                "rate limit window must be positive",
                format!("limiter '{}'", self.prefix),
            ));
        }
        if self.burst_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(WardenError::config_with_context(
                "burst interval must be positive when set",
                format!("limiter '{}'", self.prefix),
            ));
        }
        Ok(())
    }
}

/// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The window's request budget is spent
    WindowExhausted,
    /// Too soon after the previous request
    Burst,
    /// The shared store failed and fail-closed is enabled
    StoreUnavailable,
}

/// Outcome of a rate limit check.
///
/// Rejection is an ordinary value; callers must inspect `allowed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window, when allowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    /// Milliseconds until a retry can succeed, when rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl RateLimitDecision {
    pub fn allow(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining: Some(remaining),
            remaining_ms: None,
            reason: None,
        }
    }

    pub fn reject(reason: RejectReason, remaining_ms: u64) -> Self {
        Self {
            allowed: false,
            remaining: None,
            remaining_ms: Some(remaining_ms.max(1)),
            reason: Some(reason),
        }
    }
}
