//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::file::config_directory;
use super::settings::*;

// =============================================================================
// Backend
// =============================================================================

/// Default backend REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";

/// Default backend push feed base URL.
pub const DEFAULT_WS_BASE_URL: &str = "ws://localhost:3001";

/// Default per-request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

// =============================================================================
// Sources
// =============================================================================

/// Default polling interval in milliseconds.
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 3000;

/// Default simulation step interval in milliseconds.
pub const DEFAULT_SIMULATION_INTERVAL_MS: u64 = 3000;

/// Default live status aggregator base URL.
pub const DEFAULT_LIVE_STATUS_BASE_URL: &str = "https://irctc1.p.rapidapi.com";

/// Default live status `X-RapidAPI-Host` header.
pub const DEFAULT_LIVE_STATUS_HOST: &str = "irctc1.p.rapidapi.com";

/// Default live status interval in seconds.
pub const DEFAULT_LIVE_STATUS_INTERVAL_SECS: u64 = 60;

// =============================================================================
// Logging
// =============================================================================

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "railwatch.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            api: ApiSettings {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            },
            websocket: WebSocketSettings {
                base_url: DEFAULT_WS_BASE_URL.to_string(),
            },
            polling: PollingSettings {
                interval_ms: DEFAULT_POLLING_INTERVAL_MS,
            },
            simulation: SimulationSettings {
                interval_ms: DEFAULT_SIMULATION_INTERVAL_MS,
            },
            live_status: LiveStatusSettings {
                enabled: false,
                api_key: None,
                base_url: DEFAULT_LIVE_STATUS_BASE_URL.to_string(),
                host: DEFAULT_LIVE_STATUS_HOST.to_string(),
                interval_secs: DEFAULT_LIVE_STATUS_INTERVAL_SECS,
            },
            logging: LoggingSettings {
                directory: config_directory().join("logs"),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
