//! Fallback values for optional feed fields.
//!
//! Every output is built from [`FieldDefaults`] at the join boundary, so a
//! missing route color or stop name is resolved in exactly one place.
//!
//! Stored as a plain JSON object on disk; absent keys keep the built-in value:
//! ```json
//! {
//!   "route_color": "000000",
//!   "route_text_color": "FFFFFF"
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldDefaults {
    pub route_short_name: String,
    pub route_long_name: String,
    /// Hex color without a leading `#`.
    pub route_color: String,
    /// Hex color without a leading `#`.
    pub route_text_color: String,
    pub stop_name: String,
    pub stop_code: String,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self {
            route_short_name: String::new(),
            route_long_name: String::new(),
            route_color: "000000".to_string(),
            route_text_color: "FFFFFF".to_string(),
            stop_name: String::new(),
            stop_code: String::new(),
        }
    }
}

impl FieldDefaults {
    /// Loads the table from a JSON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds unknown keys.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let defaults: FieldDefaults = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(defaults)
    }

    /// Loads `path` if given, otherwise returns the built-in table.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Picks `value` unless it is absent or empty.
    pub fn resolve(value: Option<&str>, fallback: &str) -> String {
        value
            .filter(|v| !v.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}
