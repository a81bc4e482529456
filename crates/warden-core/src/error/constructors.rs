//! Constructor methods for WardenError

use super::types::WardenError;

impl WardenError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a new counter store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            context: None,
        }
    }

    /// Create the aggregate "every provider is down" error
    pub fn all_providers_unavailable(
        providers: impl IntoIterator<Item = impl Into<String>>,
        last_error: Option<String>,
    ) -> Self {
        Self::AllProvidersUnavailable {
            providers: providers.into_iter().map(Into::into).collect(),
            last_error,
        }
    }

    /// Create a spending block error
    pub fn spending_blocked(window: impl Into<String>, spent_usd: f64) -> Self {
        Self::SpendingBlocked {
            window: window.into(),
            spent_usd,
        }
    }

    /// Create an IO error tied to a path
    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            context: None,
        }
    }
}
