//! Type definitions for failover

use crate::error::{WardenError, WardenResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failover settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// When false, calls go straight to the primary with no bookkeeping
    pub enabled: bool,
    /// Provider priority order; the first two are the default primary and fallback
    pub providers: Vec<String>,
    /// Deadline applied to each provider call
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub call_timeout: Option<Duration>,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            providers: vec![
                "anthropic".to_string(),
                "openai".to_string(),
                "google".to_string(),
            ],
            call_timeout: None,
        }
    }
}

impl FailoverConfig {
    pub fn validate(&self) -> WardenResult<()> {
        if self.providers.is_empty() {
            return Err(WardenError::config("provider order must name at least one provider"));
        }
        if self.providers.iter().any(|name| name.trim().is_empty()) {
            return Err(WardenError::config_with_context(
                "provider names must not be blank",
                format!("providers = {:?}", self.providers),
            ));
        }
        if self.call_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(WardenError::config("failover call timeout must be positive"));
        }
        Ok(())
    }
}

/// Which tier served a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTier {
    Primary,
    Fallback,
}

impl std::fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct FailoverOptions {
    /// Primary provider name; defaults to the first configured provider
    pub primary: Option<String>,
    /// Fallback provider name; defaults to the second configured provider
    pub fallback: Option<String>,
    /// Overrides the configured call timeout
    pub timeout: Option<Duration>,
}

impl FailoverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name both tiers
    pub fn providers(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: Some(primary.into()),
            fallback: Some(fallback.into()),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Successful result plus where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailoverOutcome<T> {
    pub result: T,
    pub provider: ProviderTier,
    pub provider_name: String,
    pub used_fallback: bool,
    /// Wall-clock time of the call path that ran
    pub duration_ms: u64,
}

/// Why traffic moved to the fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailoverReason {
    /// The primary's circuit was open
    CircuitOpen,
    /// The primary failed with a provider error
    ProviderError(String),
    /// The primary did not answer in time
    Timeout,
}

impl std::fmt::Display for FailoverReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CircuitOpen => write!(f, "circuit open"),
            Self::ProviderError(message) => write!(f, "provider error: {}", message),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Record of one failover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverEvent {
    pub from_provider: String,
    pub to_provider: String,
    pub reason: FailoverReason,
    pub at: DateTime<Utc>,
}

/// Failure of a failover-protected call.
///
/// `Call` carries the provider call's own error unchanged.
#[derive(Error, Debug)]
pub enum FailoverError<E> {
    #[error(transparent)]
    Call(E),

    #[error("All providers unavailable ({primary}, {fallback})")]
    AllProvidersUnavailable {
        primary: String,
        fallback: String,
        last_error: Option<String>,
    },

    #[error("Provider {provider} did not answer within {timeout:?}")]
    TimedOut { provider: String, timeout: Duration },
}

impl<E> FailoverError<E> {
    /// True for the aggregate "every provider is down" case
    pub fn is_all_providers_unavailable(&self) -> bool {
        matches!(self, Self::AllProvidersUnavailable { .. })
    }

    /// The provider call's own error, if that is what failed
    pub fn into_call_error(self) -> Option<E> {
        match self {
            Self::Call(error) => Some(error),
            _ => None,
        }
    }
}

impl<E: std::fmt::Display> From<FailoverError<E>> for WardenError {
    fn from(error: FailoverError<E>) -> Self {
        match error {
            FailoverError::AllProvidersUnavailable {
                primary,
                fallback,
                last_error,
            } => WardenError::all_providers_unavailable([primary, fallback], last_error),
            other => WardenError::other(other_message(&other)),
        }
    }
}

fn other_message<E: std::fmt::Display>(error: &FailoverError<E>) -> String {
    match error {
        FailoverError::Call(inner) => inner.to_string(),
        FailoverError::TimedOut { provider, timeout } => {
            format!("Provider {} did not answer within {:?}", provider, timeout)
        }
        FailoverError::AllProvidersUnavailable { .. } => "All providers unavailable".to_string(),
    }
}
