//! # Config Loader
//!
//! Loads publisher configuration.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate file-level settings, report broken endpoint entries as warnings
//! - Produce a `PubControlConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("pubcontrol.toml")).unwrap();
//! println!("endpoints: {}", config.endpoints.len());
//! ```

mod parser;
mod validator;

pub use contracts::PubControlConfig;
pub use parser::ConfigFormat;
pub use validator::{usable_endpoints, warnings};

use contracts::PubControlError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file path
    ///
    /// The format is detected from the extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Invalid client settings
    ///
    /// Broken endpoint entries are not errors; see [`warnings`].
    pub fn load_from_path(path: &Path) -> Result<PubControlConfig, PubControlError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), ?format, "Loading configuration");
        Self::load_from_str(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<PubControlConfig, PubControlError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        for warning in validator::warnings(&config) {
            tracing::warn!(%warning, "Configuration warning");
        }
        Ok(config)
    }

    pub fn to_toml(config: &PubControlConfig) -> Result<String, PubControlError> {
        toml::to_string_pretty(config)
            .map_err(|e| PubControlError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(config: &PubControlConfig) -> Result<String, PubControlError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| PubControlError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, PubControlError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            PubControlError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            PubControlError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}
