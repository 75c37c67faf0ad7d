//! Route data supplied when a watch starts.

use serde::{Deserialize, Serialize};

use super::state::{Coordinates, LocationUpdate};

/// A point along a train's route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_name: Option<String>,
}

impl Waypoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            station_name: None,
        }
    }

    pub fn station(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            station_name: Some(name.into()),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

/// Ordered sequence of waypoints for one train.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route {
    waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Seed update built from the first waypoint, used when no static
    /// location is known for the train.
    pub fn origin_update(&self) -> Option<LocationUpdate> {
        let first = self.waypoints.first()?;
        let mut update = LocationUpdate::at(first.lat, first.lng);
        update.next_station = self.waypoints.get(1).and_then(|w| w.station_name.clone());
        Some(update)
    }
}

impl From<Vec<Waypoint>> for Route {
    fn from(waypoints: Vec<Waypoint>) -> Self {
        Self::new(waypoints)
    }
}
