//! Configuration loading and persistence.
//!
//! Non-secret settings live in `config.json` in the config directory.
//! The user secret and device ID are stored separately via the keyring
//! module.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{fs, path::PathBuf};

use crate::constants::DEFAULT_API_URL;
use crate::output::OutputFormat;

/// Overrides the config directory.
pub const CONFIG_DIR_VAR: &str = "PUSHWIRE_CONFIG_DIR";
/// Overrides the REST API base URL.
pub const API_URL_VAR: &str = "PUSHWIRE_API_URL";
/// Overrides the default output format.
pub const FORMAT_VAR: &str = "PUSHWIRE_FORMAT";

/// Configuration for the pushwire CLI.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Pushover REST API.
    pub api_url: String,
    /// Default output format for `listen`.
    pub format: OutputFormat,
    /// Default template for the `template` format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            format: OutputFormat::default(),
            template: None,
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `#[cfg(test)]` (unit tests): `tmp/pushwire-test`
    /// 2. `PUSHWIRE_CONFIG_DIR` env var: explicit override
    /// 3. `PUSHWIRE_ENV=test`: `tmp/pushwire-test`
    /// 4. Default: platform config dir (Linux: ~/.config/pushwire)
    pub fn config_dir() -> Result<PathBuf> {
        let dir = {
            #[cfg(test)]
            {
                PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/pushwire-test")
            }

            #[cfg(not(test))]
            {
                if let Ok(dir) = std::env::var(CONFIG_DIR_VAR) {
                    PathBuf::from(dir)
                } else if crate::env::should_skip_keyring() {
                    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tmp/pushwire-test")
                } else {
                    dirs::config_dir()
                        .context("Could not determine config directory")?
                        .join("pushwire")
                }
            }
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("error creating config directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    ///
    /// A missing or unreadable file falls back to defaults.
    pub fn load() -> Result<Self> {
        let mut config = match Self::load_from_file() {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("Ignoring config file: {e:#}");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_file() -> Result<Option<Self>> {
        let config_path = Self::config_dir()?.join("config.json");
        if !config_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&config_path)?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("error parsing {}", config_path.display()))?;
        Ok(Some(config))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(api_url) = std::env::var(API_URL_VAR) {
            self.api_url = api_url;
        }

        if let Ok(format) = std::env::var(FORMAT_VAR) {
            match format.parse() {
                Ok(format) => self.format = format,
                Err(e) => log::warn!("Ignoring {FORMAT_VAR}: {e}"),
            }
        }
    }

    /// Persists the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_dir()?.join("config.json");
        fs::write(&config_path, serde_json::to_string_pretty(self)?)?;

        #[cfg(unix)]
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_url, "https://api.pushover.net/1");
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.template.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"format": "text"}"#).unwrap();
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_serialize_skips_missing_template() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(!json.contains("template"));
        assert!(json.contains("\"format\":\"json\""));
    }

    #[test]
    fn test_config_dir_is_under_manifest_in_tests() {
        let dir = Config::config_dir().unwrap();
        assert!(dir.ends_with("tmp/pushwire-test"));
        assert!(dir.exists());
    }
}
