//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [api] section
    if let Some(section) = ini.section(Some("api")) {
        if let Some(v) = non_empty(section, "base_url") {
            config.api.base_url = v;
        }
        if let Some(v) = section.get("request_timeout_ms") {
            config.api.request_timeout_ms = parse_millis("api", "request_timeout_ms", v)?;
        }
    }

    // [websocket] section
    if let Some(section) = ini.section(Some("websocket")) {
        if let Some(v) = non_empty(section, "base_url") {
            config.websocket.base_url = v;
        }
    }

    // [polling] section
    if let Some(section) = ini.section(Some("polling")) {
        if let Some(v) = section.get("interval_ms") {
            config.polling.interval_ms = parse_millis("polling", "interval_ms", v)?;
        }
    }

    // [simulation] section
    if let Some(section) = ini.section(Some("simulation")) {
        if let Some(v) = section.get("interval_ms") {
            config.simulation.interval_ms = parse_millis("simulation", "interval_ms", v)?;
        }
    }

    // [live_status] section
    if let Some(section) = ini.section(Some("live_status")) {
        if let Some(v) = section.get("enabled") {
            config.live_status.enabled = parse_bool(v);
        }
        config.live_status.api_key = non_empty(section, "api_key");
        if let Some(v) = non_empty(section, "base_url") {
            config.live_status.base_url = v;
        }
        if let Some(v) = non_empty(section, "host") {
            config.live_status.host = v;
        }
        if let Some(v) = section.get("interval_secs") {
            config.live_status.interval_secs =
                v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "live_status".to_string(),
                    key: "interval_secs".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer (seconds)".to_string(),
                })?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = expand_tilde(&v);
        }
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v;
        }
    }

    Ok(config)
}

fn non_empty(section: &Properties, key: &str) -> Option<String> {
    section
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_millis(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a positive integer (milliseconds)".to_string(),
        })
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_partial_config() {
        let config = load(
            r#"
[api]
base_url = https://trains.example.com

[polling]
interval_ms = 10000
"#,
        )
        .unwrap();

        // Specified values
        assert_eq!(config.api.base_url, "https://trains.example.com");
        assert_eq!(config.polling.interval_ms, 10000);

        // Default values
        assert_eq!(config.api.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(config.websocket.base_url, DEFAULT_WS_BASE_URL);
        assert_eq!(
            config.simulation.interval_ms,
            DEFAULT_SIMULATION_INTERVAL_MS
        );
        assert!(!config.live_status.enabled);
    }

    #[test]
    fn test_invalid_interval() {
        let err = load(
            r#"
[simulation]
interval_ms = fast
"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("simulation.interval_ms"));
        assert!(err.to_string().contains("milliseconds"));
    }

    #[test]
    fn test_live_status_section() {
        let config = load(
            r#"
[live_status]
enabled = yes
api_key = secret
interval_secs = 120
"#,
        )
        .unwrap();

        assert!(config.live_status.enabled);
        assert_eq!(config.live_status.api_key.as_deref(), Some("secret"));
        assert_eq!(config.live_status.interval_secs, 120);
        assert_eq!(config.live_status.host, DEFAULT_LIVE_STATUS_HOST);
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let config = load(
            r#"
[live_status]
api_key =
"#,
        )
        .unwrap();

        assert!(config.live_status.api_key.is_none());
    }

    #[test]
    fn test_logging_directory_expands_tilde() {
        let config = load(
            r#"
[logging]
directory = ~/railwatch-logs
file = watch.log
"#,
        )
        .unwrap();

        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.logging.directory, home.join("railwatch-logs"));
        }
        assert_eq!(config.logging.file, "watch.log");
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("test/path"));
        }

        // Non-tilde paths should be unchanged
        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_parse_bool_values() {
        for v in ["true", "TRUE", "1", "yes", "on", " On "] {
            assert!(parse_bool(v), "{} should be true", v);
        }
        for v in ["false", "0", "no", "off", "", "maybe"] {
            assert!(!parse_bool(v), "{} should be false", v);
        }
    }
}
