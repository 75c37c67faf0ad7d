//! Simulation fallback adapter - advances the train along its route.
//!
//! When both network paths have failed, the [`SimulationAdapter`] keeps the
//! dashboard moving by stepping through the route's waypoints, one per tick,
//! wrapping back to the start at the end. Updates carry coordinates only; the
//! sticky-field merge keeps the last known speed, status and ETA.
//!
//! The route cursor lives inside the adapter task, so a tick always reads the
//! cursor value written by the previous tick.
//!
//! This adapter never fails. An empty route simply produces no updates.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::events::{EventSink, SourceEventKind};
use super::route::Route;
use super::state::{Coordinates, LocationUpdate};

/// Default simulation tick interval (3 seconds).
pub const DEFAULT_SIMULATION_INTERVAL: Duration =
    Duration::from_millis(crate::config::DEFAULT_SIMULATION_INTERVAL_MS);

/// Configuration for the simulation adapter.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Time between cursor steps.
    pub interval: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SIMULATION_INTERVAL,
        }
    }
}

impl SimulationConfig {
    /// Create configuration from the config file settings.
    pub fn from_config(config: &crate::config::ConfigFile) -> Self {
        Self {
            interval: Duration::from_millis(config.simulation.interval_ms),
        }
    }
}

/// Cyclic cursor over a route.
#[derive(Debug, Clone)]
pub struct RouteCursor {
    route: Route,
    index: usize,
}

impl RouteCursor {
    pub fn new(route: Route) -> Self {
        Self::starting_at(route, 0)
    }

    /// Start at `index`, wrapped into the route length.
    pub fn starting_at(route: Route, index: usize) -> Self {
        let index = if route.is_empty() {
            0
        } else {
            index % route.len()
        };
        Self { route, index }
    }

    /// Index the next call to [`advance`](Self::advance) will emit.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Emit the waypoint under the cursor and step forward, wrapping at the end.
    pub fn advance(&mut self) -> Option<Coordinates> {
        let coordinates = self.route.get(self.index)?.coordinates();
        self.index = (self.index + 1) % self.route.len();
        Some(coordinates)
    }
}

impl Iterator for RouteCursor {
    type Item = Coordinates;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}

/// Simulation adapter for one train.
pub struct SimulationAdapter {
    cursor: RouteCursor,
    config: SimulationConfig,
    sink: EventSink,
}

impl SimulationAdapter {
    pub fn new(route: Route, config: SimulationConfig, sink: EventSink) -> Self {
        Self {
            cursor: RouteCursor::new(route),
            config,
            sink,
        }
    }

    /// Start the adapter as an async task.
    pub fn start(self) -> JoinHandle<()> {
        let resource = self.sink.hold_resource();
        tokio::spawn(async move {
            let _resource = resource;
            self.run().await;
        })
    }

    async fn run(mut self) {
        tracing::info!(
            waypoints = self.cursor.route.len(),
            interval_ms = self.config.interval.as_millis() as u64,
            "Simulation adapter started"
        );

        if self.cursor.route.is_empty() {
            tracing::warn!("Route has no waypoints, simulation will not move the train");
        }

        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = self.sink.cancelled() => break,
                _ = interval.tick() => {
                    let index = self.cursor.index();
                    let Some(coordinates) = self.cursor.advance() else {
                        continue;
                    };

                    tracing::trace!(index, lat = coordinates.lat, lng = coordinates.lng, "Simulation tick");

                    let update = LocationUpdate {
                        coordinates: Some(coordinates),
                        ..Default::default()
                    };
                    if !self.sink.emit(SourceEventKind::Update(update)).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Simulation adapter stopped");
    }
}
