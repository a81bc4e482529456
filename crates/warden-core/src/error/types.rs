//! Core error type for the resilience layer

use thiserror::Error;

/// Result type alias for Warden operations
pub type WardenResult<T> = Result<T, WardenError>;

/// Main error type for Warden
#[derive(Error, Debug, Clone)]
pub enum WardenError {
    /// Invalid configuration; fatal at construction time
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Shared counter store failure
    #[error("Counter store error: {message}")]
    Store {
        message: String,
        context: Option<String>,
    },

    /// Every provider tier is unavailable
    #[error("All providers unavailable: {}", providers.join(", "))]
    AllProvidersUnavailable {
        providers: Vec<String>,
        last_error: Option<String>,
    },

    /// Spend cap reached while hard blocking is enabled
    #[error("Spending limit exceeded for {window} window ({spent_usd:.2} USD)")]
    SpendingBlocked { window: String, spent_usd: f64 },

    /// IO errors (configuration files)
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// Generic error with context
    #[error("Error: {message}")]
    Other {
        message: String,
        context: Option<String>,
    },
}

impl WardenError {
    /// Whether a caller may reasonably retry the operation later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store { .. } | Self::AllProvidersUnavailable { .. } | Self::SpendingBlocked { .. }
        )
    }

    /// Short machine-readable code for the error variant
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "WARDEN_CONFIG",
            Self::Store { .. } => "WARDEN_STORE",
            Self::AllProvidersUnavailable { .. } => "WARDEN_ALL_PROVIDERS_DOWN",
            Self::SpendingBlocked { .. } => "WARDEN_SPEND_BLOCKED",
            Self::Io { .. } => "WARDEN_IO",
            Self::Other { .. } => "WARDEN_OTHER",
        }
    }
}
