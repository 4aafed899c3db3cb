use std::path::Path;

use serde_json::Value;

use crate::errors::{ConfigError, Result};

/// Read a config file as a JSON value, picking the parser by extension.
///
/// TOML documents are converted to JSON so both formats go through the same
/// JSON Schema validation.
pub fn load_config_value(path: &Path) -> Result<Value> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        }
        Some("toml") => {
            let content = std::fs::read_to_string(path)?;
            let value: toml::Value = toml::from_str(&content)?;
            Ok(serde_json::to_value(value)?)
        }
        _ => Err(ConfigError::Unsupported(format!(
            "config file must be .json or .toml: {}",
            path.display()
        ))),
    }
}
