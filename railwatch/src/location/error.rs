//! Error types for location reconciliation.
//!
//! Two layers:
//! - [`SourceError`] - what an individual adapter saw go wrong (HTTP status,
//!   timeout, socket close). Never crosses the controller boundary.
//! - [`LocationError`] - the public taxonomy. Only `InvalidTrain` and
//!   `Configuration` are returned to callers of the lifecycle manager.

use thiserror::Error;

use super::state::UpdateSource;

/// Public error taxonomy for the reconciliation core.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocationError {
    /// Incoming update lacks coordinates or could not be parsed.
    ///
    /// Recovered locally: the previous snapshot stays authoritative.
    #[error("Malformed location update: {0}")]
    MalformedUpdate(String),

    /// A network source failed (socket closed, request failed or timed out).
    ///
    /// Recovered by a topology transition.
    #[error("{adapter} source unavailable: {reason}")]
    SourceUnavailable {
        adapter: UpdateSource,
        reason: String,
    },

    /// Empty or unknown train identifier, or no train is being watched.
    #[error("Invalid train: {0}")]
    InvalidTrain(String),

    /// Base URLs missing or invalid, or other startup configuration problems.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LocationError {
    /// Build a `SourceUnavailable` from an adapter-level failure.
    pub fn unavailable(adapter: UpdateSource, error: &SourceError) -> Self {
        Self::SourceUnavailable {
            adapter,
            reason: error.to_string(),
        }
    }

    /// Returns true for errors that callers are expected to handle.
    ///
    /// Everything else is absorbed by the lifecycle manager.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidTrain(_) | Self::Configuration(_))
    }
}

impl From<crate::config::ConfigFileError> for LocationError {
    fn from(err: crate::config::ConfigFileError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Failures observed by a single source adapter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Server answered with a non-success status.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Request did not complete within the configured timeout.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Response body was not the expected JSON shape.
    #[error("Failed to parse response: {0}")]
    Json(String),

    /// WebSocket handshake or connection failure.
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// Connection closed by the peer or by a stream error.
    #[error("Connection closed: {0}")]
    Closed(String),

    /// Third-party API quota exhausted (HTTP 429).
    #[error("API quota exceeded")]
    QuotaExceeded,

    /// Third-party API does not know this train (HTTP 404).
    #[error("Train {0} not found")]
    TrainNotFound(String),

    /// Third-party API answered but reported no data.
    #[error("No live data available: {0}")]
    NoData(String),

    /// The adapter task panicked or was aborted.
    #[error("Adapter task failed: {0}")]
    TaskFailed(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
