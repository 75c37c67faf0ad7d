//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let api_key = config.live_status.api_key.as_deref().unwrap_or("");
    let live_status_enabled = if config.live_status.enabled {
        "true"
    } else {
        "false"
    };

    format!(
        r#"[api]
; Backend REST API base URL (http or https)
; Can be overridden with RAILWATCH_API_BASE_URL
base_url = {}
; Timeout in milliseconds for each location request (default: 5000)
request_timeout_ms = {}

[websocket]
; Backend push feed base URL (ws or wss)
; Trains are subscribed at <base_url>/ws/trains/<train_id>
; Can be overridden with RAILWATCH_WS_URL
base_url = {}

[polling]
; Time between location requests after the push feed fails (default: 3000)
; Requests never overlap, so a slow request delays the next one
interval_ms = {}

[simulation]
; Time between simulated route waypoints when the network is unavailable (default: 3000)
interval_ms = {}

[live_status]
; Station-level running status from a third-party aggregator (default: false)
enabled = {}
; RapidAPI key (required when enabled)
; Can be overridden with RAILWATCH_RAPIDAPI_KEY
api_key = {}
base_url = {}
host = {}
; Time between live status requests in seconds (default: 60)
interval_secs = {}

[logging]
; Log directory (default: ~/.railwatch/logs)
directory = {}
; Log file name, cleared at session start
file = {}
"#,
        config.api.base_url,
        config.api.request_timeout_ms,
        config.websocket.base_url,
        config.polling.interval_ms,
        config.simulation.interval_ms,
        live_status_enabled,
        api_key,
        config.live_status.base_url,
        config.live_status.host,
        config.live_status.interval_secs,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Convert a path to a string, replacing the home directory with ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.api.base_url = "https://trains.example.com".to_string();
        config.polling.interval_ms = 4500;
        config.live_status.enabled = true;
        config.live_status.api_key = Some("secret".to_string());

        config.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded.api.base_url, "https://trains.example.com");
        assert_eq!(loaded.polling.interval_ms, 4500);
        assert!(loaded.live_status.enabled);
        assert_eq!(loaded.live_status.api_key.as_deref(), Some("secret"));
        assert_eq!(loaded.logging.directory, config.logging.directory);
    }

    #[test]
    fn test_missing_api_key_written_blank() {
        let content = to_config_string(&ConfigFile::default());
        assert!(content.contains("api_key = \n"));
        assert!(content.contains("enabled = false"));
    }
}
