//! Mapping from the aggregator's running-status record to a partial update.
//!
//! The aggregator is station keyed: it knows which station the train last
//! passed and how late it is, not where on the line it is. Its updates
//! therefore never carry chainage; the sticky merge keeps whatever chainage
//! the GPS feeds last reported.

use serde::Deserialize;
use serde_json::Value;

use crate::location::error::SourceError;
use crate::location::state::{Coordinates, LocationUpdate, TrainStatus};

/// A station reported by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub code: String,
    pub name: String,
    pub coordinates: Option<Coordinates>,
}

/// Live running status of one train.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStatus {
    pub current_station: Station,
    pub next_station: Option<Station>,
    pub delay_minutes: u32,
    pub speed_kmph: Option<f64>,
    /// `None` when the aggregator sent no status text.
    pub status: Option<TrainStatus>,
    pub eta: Option<String>,
    pub last_updated: Option<String>,
}

impl LiveStatus {
    /// Convert to a partial update for the reconciliation controller.
    pub fn to_update(&self) -> LocationUpdate {
        LocationUpdate {
            train_id: None,
            coordinates: self.current_station.coordinates,
            chainage_km: None,
            speed_kmph: self.speed_kmph,
            status: self.status,
            next_station: self
                .next_station
                .as_ref()
                .map(|s| s.name.clone())
                .filter(|name| !name.is_empty()),
            eta: self.eta.clone(),
            delay_minutes: Some(self.delay_minutes),
        }
    }
}

/// Map the aggregator's free-text status to a [`TrainStatus`].
///
/// Unrecognized text counts as running.
pub fn map_status(text: &str) -> TrainStatus {
    let text = text.to_lowercase();

    if text.contains("running") || text.contains("moving") {
        TrainStatus::Running
    } else if text.contains("stopped") || text.contains("halted") {
        TrainStatus::Stopped
    } else if text.contains("delayed") || text.contains("late") {
        TrainStatus::Delayed
    } else if text.contains("on time") || text.contains("on_time") || text.contains("punctual") {
        TrainStatus::OnTime
    } else if text.contains("arrived") {
        TrainStatus::Arrived
    } else if text.contains("departed") {
        TrainStatus::Departed
    } else {
        TrainStatus::Running
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawStation {
    #[serde(default)]
    station_code: Option<String>,
    #[serde(default)]
    station_name: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLiveStatus {
    #[serde(default)]
    current_station: Option<RawStation>,
    #[serde(default, rename = "currentStation")]
    current_station_code: Option<String>,
    #[serde(default, rename = "currentStationName")]
    current_station_name: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
    #[serde(default)]
    next_station: Option<RawStation>,
    #[serde(default, alias = "late_minutes")]
    delay: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default, alias = "train_status")]
    status: Option<String>,
    #[serde(default, alias = "expected_arrival")]
    eta: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
}

/// Parse an aggregator response body.
///
/// The record may be wrapped in `{ "success": .., "data": {..} }` or sent bare.
/// `success: false` maps to [`SourceError::NoData`].
pub fn parse_live_status(body: &[u8]) -> Result<LiveStatus, SourceError> {
    let value: Value = serde_json::from_slice(body)?;

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("aggregator reported failure")
            .to_string();
        return Err(SourceError::NoData(message));
    }

    let data = match value.get("data") {
        Some(data) if data.is_object() => data.clone(),
        _ => value,
    };
    let raw: RawLiveStatus = serde_json::from_value(data)?;

    let current = raw.current_station.unwrap_or_default();
    let current_coordinates = current
        .lat
        .or(raw.lat)
        .zip(current.lng.or(raw.lng))
        .map(|(lat, lng)| Coordinates::new(lat, lng));

    Ok(LiveStatus {
        current_station: Station {
            code: current
                .station_code
                .or(raw.current_station_code)
                .unwrap_or_default(),
            name: current
                .station_name
                .or(raw.current_station_name)
                .unwrap_or_default(),
            coordinates: current_coordinates,
        },
        next_station: raw.next_station.map(|s| Station {
            code: s.station_code.unwrap_or_default(),
            name: s.station_name.unwrap_or_default(),
            coordinates: s.lat.zip(s.lng).map(|(lat, lng)| Coordinates::new(lat, lng)),
        }),
        delay_minutes: raw
            .delay
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.round() as u32)
            .unwrap_or(0),
        speed_kmph: raw.speed,
        status: raw
            .status
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(map_status),
        eta: raw.eta.filter(|e| !e.is_empty()),
        last_updated: raw.last_updated,
    })
}
