//! Core state types for train location tracking.
//!
//! This module defines the fundamental types used throughout the location core:
//!
//! - [`TrainId`] - Validated, non-empty train identifier
//! - [`Coordinates`] - Latitude/longitude pair
//! - [`TrainStatus`] - Operational status reported by a feed
//! - [`UpdateSource`] - Which adapter produced an update
//! - [`LocationUpdate`] - Partial update emitted by an adapter
//! - [`TrainLocation`] - Immutable authoritative snapshot
//! - [`WatchState`] / [`SourceTopology`] - Lifecycle state reported to consumers

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::LocationError;

/// Identifier of a watched train (e.g. "12001").
///
/// Always non-empty; surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TrainId(String);

impl TrainId {
    /// Validate and wrap a train identifier.
    pub fn new(id: impl AsRef<str>) -> Result<Self, LocationError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(LocationError::InvalidTrain(
                "train identifier is empty".to_string(),
            ));
        }
        Ok(Self(id.to_string()))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TrainId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TrainId {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Create a coordinate pair without validation.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns true if both components are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Operational status of a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainStatus {
    #[serde(rename = "On Time")]
    OnTime,
    Delayed,
    Arrived,
    Departed,
    Stopped,
    Running,
}

impl TrainStatus {
    /// Display label used by the dashboard feeds.
    pub fn label(&self) -> &'static str {
        match self {
            TrainStatus::OnTime => "On Time",
            TrainStatus::Delayed => "Delayed",
            TrainStatus::Arrived => "Arrived",
            TrainStatus::Departed => "Departed",
            TrainStatus::Stopped => "Stopped",
            TrainStatus::Running => "Running",
        }
    }
}

impl fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TrainStatus {
    type Err = LocationError;

    /// Accepts display labels ("On Time") and enum-style names ("ON_TIME").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "on time" | "ontime" => Ok(TrainStatus::OnTime),
            "delayed" => Ok(TrainStatus::Delayed),
            "arrived" => Ok(TrainStatus::Arrived),
            "departed" => Ok(TrainStatus::Departed),
            "stopped" => Ok(TrainStatus::Stopped),
            "running" => Ok(TrainStatus::Running),
            _ => Err(LocationError::MalformedUpdate(format!(
                "unknown train status '{}'",
                s
            ))),
        }
    }
}

/// Source that produced the most recent merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateSource {
    /// Push feed over WebSocket.
    WebSocket,
    /// REST polling fallback.
    Polling,
    /// Local route simulation (terminal fallback).
    Simulation,
    /// Third-party live running status aggregator.
    LiveStatus,
}

impl fmt::Display for UpdateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateSource::WebSocket => write!(f, "WebSocket"),
            UpdateSource::Polling => write!(f, "Polling"),
            UpdateSource::Simulation => write!(f, "Simulation"),
            UpdateSource::LiveStatus => write!(f, "LiveStatus"),
        }
    }
}

/// Partial location update emitted by a source adapter.
///
/// Only `coordinates` is mandatory for a merge to succeed; every other field
/// is optional and left untouched in the snapshot when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationUpdate {
    /// Train the update refers to, when the feed reports it.
    pub train_id: Option<TrainId>,
    pub coordinates: Option<Coordinates>,
    pub chainage_km: Option<String>,
    pub speed_kmph: Option<f64>,
    pub status: Option<TrainStatus>,
    pub next_station: Option<String>,
    pub eta: Option<String>,
    pub delay_minutes: Option<u32>,
}

impl LocationUpdate {
    /// Create an update carrying only coordinates.
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            coordinates: Some(Coordinates::new(lat, lng)),
            ..Default::default()
        }
    }

    pub fn for_train(mut self, train_id: TrainId) -> Self {
        self.train_id = Some(train_id);
        self
    }

    pub fn with_chainage(mut self, chainage_km: impl Into<String>) -> Self {
        self.chainage_km = Some(chainage_km.into());
        self
    }

    pub fn with_speed(mut self, speed_kmph: f64) -> Self {
        self.speed_kmph = Some(speed_kmph);
        self
    }

    pub fn with_status(mut self, status: TrainStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_next_station(mut self, station: impl Into<String>) -> Self {
        self.next_station = Some(station.into());
        self
    }

    pub fn with_eta(mut self, eta: impl Into<String>) -> Self {
        self.eta = Some(eta.into());
        self
    }

    pub fn with_delay(mut self, delay_minutes: u32) -> Self {
        self.delay_minutes = Some(delay_minutes);
        self
    }
}

/// Authoritative location snapshot for the watched train.
///
/// Snapshots are immutable once published: the controller produces a fresh
/// value for every merge and shares it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainLocation {
    pub train_id: TrainId,
    pub coordinates: Coordinates,
    pub chainage_km: Option<String>,
    pub speed_kmph: Option<f64>,
    pub status: Option<TrainStatus>,
    pub next_station: Option<String>,
    pub eta: Option<String>,
    pub delay_minutes: Option<u32>,
    /// `None` until the first merge after seeding.
    pub last_update_source: Option<UpdateSource>,
    pub last_update_timestamp: DateTime<Utc>,
}

/// Lifecycle state of the subscription manager.
///
/// ```text
/// Idle ──watch──► Connecting ──first message──► WebSocketPrimary
///                     │                               │
///                     └────── socket error/close ─────┤
///                                                     ▼
///                  Connecting ◄──retry── SimulationOnly ◄──poll failure── PollingFallback
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WatchState {
    #[default]
    Idle,
    Connecting,
    WebSocketPrimary,
    PollingFallback,
    SimulationOnly,
}

impl WatchState {
    /// Source topology active in this state, if any.
    pub fn topology(&self) -> Option<SourceTopology> {
        match self {
            WatchState::Idle => None,
            WatchState::Connecting | WatchState::WebSocketPrimary => {
                Some(SourceTopology::WebSocketPrimary)
            }
            WatchState::PollingFallback => Some(SourceTopology::PollingFallback),
            WatchState::SimulationOnly => Some(SourceTopology::SimulationOnly),
        }
    }

    /// The adapter whose events are accepted in this state.
    pub fn primary_source(&self) -> Option<UpdateSource> {
        self.topology().map(|t| t.source())
    }
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchState::Idle => write!(f, "Idle"),
            WatchState::Connecting => write!(f, "Connecting"),
            WatchState::WebSocketPrimary => write!(f, "WebSocketPrimary"),
            WatchState::PollingFallback => write!(f, "PollingFallback"),
            WatchState::SimulationOnly => write!(f, "SimulationOnly"),
        }
    }
}

/// Active combination of live source and fallback for one train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceTopology {
    WebSocketPrimary,
    PollingFallback,
    SimulationOnly,
}

impl SourceTopology {
    /// Adapter that feeds this topology.
    pub fn source(&self) -> UpdateSource {
        match self {
            SourceTopology::WebSocketPrimary => UpdateSource::WebSocket,
            SourceTopology::PollingFallback => UpdateSource::Polling,
            SourceTopology::SimulationOnly => UpdateSource::Simulation,
        }
    }
}

/// Status of the lifecycle manager published to observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchStatus {
    pub state: WatchState,
    pub train_id: Option<TrainId>,
}
