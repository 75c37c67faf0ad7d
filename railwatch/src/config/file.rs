//! Configuration file handling for ~/.railwatch/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use reqwest::Url;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::ConfigFile;

/// Environment variable overriding `[api] base_url`.
pub const ENV_API_BASE_URL: &str = "RAILWATCH_API_BASE_URL";

/// Environment variable overriding `[websocket] base_url`.
pub const ENV_WS_URL: &str = "RAILWATCH_WS_URL";

/// Environment variable overriding `[live_status] api_key`.
pub const ENV_RAPIDAPI_KEY: &str = "RAILWATCH_RAPIDAPI_KEY";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.railwatch/config.ini).
    ///
    /// Environment overrides are applied on top of the file.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.railwatch/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
        }
        Ok(path)
    }

    /// Apply `RAILWATCH_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = lookup(ENV_API_BASE_URL) {
            tracing::debug!(base_url = %v, "API base URL overridden from environment");
            self.api.base_url = v;
        }
        if let Some(v) = lookup(ENV_WS_URL) {
            tracing::debug!(base_url = %v, "WebSocket base URL overridden from environment");
            self.websocket.base_url = v;
        }
        if let Some(v) = lookup(ENV_RAPIDAPI_KEY) {
            tracing::debug!("Live status API key taken from environment");
            self.live_status.api_key = Some(v);
        }
    }

    /// Check values that parse but cannot work at runtime.
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        check_url("api", "base_url", &self.api.base_url, &["http", "https"])?;
        check_url("websocket", "base_url", &self.websocket.base_url, &["ws", "wss"])?;

        check_non_zero("api", "request_timeout_ms", self.api.request_timeout_ms)?;
        check_non_zero("polling", "interval_ms", self.polling.interval_ms)?;
        check_non_zero("simulation", "interval_ms", self.simulation.interval_ms)?;

        if self.live_status.enabled {
            if self.live_status.api_key.is_none() {
                return Err(ConfigFileError::InvalidValue {
                    section: "live_status".to_string(),
                    key: "api_key".to_string(),
                    value: String::new(),
                    reason: format!("required when live status is enabled (or set {})", ENV_RAPIDAPI_KEY),
                });
            }
            check_url(
                "live_status",
                "base_url",
                &self.live_status.base_url,
                &["http", "https"],
            )?;
            check_non_zero("live_status", "interval_secs", self.live_status.interval_secs)?;
        }

        Ok(())
    }
}

fn check_url(
    section: &str,
    key: &str,
    value: &str,
    schemes: &[&str],
) -> Result<(), ConfigFileError> {
    let invalid = |reason: String| ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(format!("not a valid URL: {}", e)))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(format!("scheme must be one of: {}", schemes.join(", "))));
    }
    Ok(())
}

fn check_non_zero(section: &str, key: &str, value: u64) -> Result<(), ConfigFileError> {
    if value == 0 {
        return Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// Get the path to the config directory (~/.railwatch).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".railwatch")
}

/// Get the path to the config file (~/.railwatch/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::DEFAULT_API_BASE_URL;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.api.base_url, "http://localhost:3001");
        assert_eq!(config.websocket.base_url, "ws://localhost:3001");
        assert_eq!(config.api.request_timeout_ms, 5000);
        assert_eq!(config.polling.interval_ms, 3000);
        assert_eq!(config.simulation.interval_ms, 3000);
        assert!(!config.live_status.enabled);
        assert!(config.live_status.api_key.is_none());
        assert_eq!(config.logging.file, "railwatch.log");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        let default = ConfigFile::default();

        assert_eq!(config.api.base_url, default.api.base_url);
        assert_eq!(config.polling.interval_ms, default.polling.interval_ms);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_BASE_URL, "https://api.example.com"),
            (ENV_WS_URL, "wss://feed.example.com"),
            (ENV_RAPIDAPI_KEY, "  key-from-env  "),
        ]
        .into_iter()
        .collect();

        let mut config = ConfigFile::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.websocket.base_url, "wss://feed.example.com");
        assert_eq!(config.live_status.api_key.as_deref(), Some("key-from-env"));
    }

    #[test]
    fn test_blank_env_override_ignored() {
        let mut config = ConfigFile::default();
        config.apply_overrides(|_| Some("   ".to_string()));
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert!(config.live_status.api_key.is_none());
    }

    #[test]
    fn test_validate_rejects_wrong_scheme() {
        let mut config = ConfigFile::default();
        config.websocket.base_url = "http://localhost:3001".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("websocket.base_url"));
        assert!(err.to_string().contains("ws, wss"));
    }

    #[test]
    fn test_validate_rejects_unparseable_url() {
        let mut config = ConfigFile::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = ConfigFile::default();
        config.polling.interval_ms = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("polling.interval_ms"));
    }

    #[test]
    fn test_validate_live_status_requires_key() {
        let mut config = ConfigFile::default();
        config.live_status.enabled = true;
        assert!(config.validate().is_err());

        config.live_status.api_key = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_path() {
        let path = config_file_path();
        assert!(path.ends_with(".railwatch/config.ini"));
    }
}
