//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Backend REST API settings
    pub api: ApiSettings,
    /// Backend push feed settings
    pub websocket: WebSocketSettings,
    /// Polling fallback settings
    pub polling: PollingSettings,
    /// Route simulation settings
    pub simulation: SimulationSettings,
    /// Third-party live status settings
    pub live_status: LiveStatusSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Backend REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL, e.g. `http://localhost:3001`
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

/// Backend push feed configuration.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Base URL, e.g. `ws://localhost:3001`
    pub base_url: String,
}

/// Polling fallback configuration.
#[derive(Debug, Clone)]
pub struct PollingSettings {
    /// Time between location requests in milliseconds.
    pub interval_ms: u64,
}

/// Route simulation configuration.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    /// Time between simulated waypoints in milliseconds.
    pub interval_ms: u64,
}

/// Live status aggregator configuration.
#[derive(Debug, Clone)]
pub struct LiveStatusSettings {
    /// Run the live status adapter alongside the active topology.
    pub enabled: bool,
    /// RapidAPI key (required when enabled)
    pub api_key: Option<String>,
    pub base_url: String,
    /// Value of the `X-RapidAPI-Host` header
    pub host: String,
    /// Time between requests in seconds.
    pub interval_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log directory
    pub directory: PathBuf,
    /// Log file name inside `directory`
    pub file: String,
}
