//! File-based configuration loading

use super::model::WardenConfig;
use crate::error::{WardenError, WardenResult};
use std::fs;
use std::path::Path;

/// Load configuration from a file
///
/// `.json` files are read as JSON, anything else as TOML. Sections and
/// fields left out keep their defaults.
pub fn load_from_file(path: &Path) -> WardenResult<WardenConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        WardenError::io_with_path(
            format!("Failed to read config file: {}", e),
            path.display().to_string(),
        )
    })?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| {
            WardenError::config_with_context(
                format!("Failed to parse JSON config: {}", e),
                format!("Deserializing JSON configuration from '{}'", path.display()),
            )
        }),
        _ => toml::from_str(&content).map_err(|e| {
            WardenError::config_with_context(
                format!("Failed to parse TOML config: {}", e),
                format!("Deserializing TOML configuration from '{}'", path.display()),
            )
        }),
    }
}
