//! Configuration for Railwatch.
//!
//! User settings live in `~/.railwatch/config.ini`, one `[section]` per concern:
//!
//! - `[api]` and `[websocket]` - backend endpoints
//! - `[polling]` and `[simulation]` - fallback source intervals
//! - `[live_status]` - optional third-party running status feed
//! - `[logging]` - log file location
//!
//! Runtime components build their own `*Config` structs from a [`ConfigFile`]
//! via `from_config()`.
//!
//! # Example
//!
//! ```ignore
//! use railwatch::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! config.validate()?;
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use file::{
    config_directory, config_file_path, ConfigFileError, ENV_API_BASE_URL, ENV_RAPIDAPI_KEY,
    ENV_WS_URL,
};
pub use settings::{
    ApiSettings, ConfigFile, LiveStatusSettings, LoggingSettings, PollingSettings,
    SimulationSettings, WebSocketSettings,
};
pub use defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_LIVE_STATUS_BASE_URL, DEFAULT_LIVE_STATUS_HOST,
    DEFAULT_LIVE_STATUS_INTERVAL_SECS, DEFAULT_LOG_FILE, DEFAULT_POLLING_INTERVAL_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SIMULATION_INTERVAL_MS, DEFAULT_WS_BASE_URL,
};
