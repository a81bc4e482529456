//! Conversions from external error types

use super::types::WardenError;
use crate::store::StoreError;

impl From<std::io::Error> for WardenError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
            path: None,
        }
    }
}

impl From<toml::de::Error> for WardenError {
    fn from(error: toml::de::Error) -> Self {
        Self::config_with_context(error.message().to_string(), "parsing TOML configuration")
    }
}

impl From<toml::ser::Error> for WardenError {
    fn from(error: toml::ser::Error) -> Self {
        Self::other(format!("failed to render configuration: {}", error))
    }
}

impl From<StoreError> for WardenError {
    fn from(error: StoreError) -> Self {
        Self::store(error.to_string())
    }
}
