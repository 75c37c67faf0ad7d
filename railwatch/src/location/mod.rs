//! Train Location Reconciliation Module
//!
//! This module keeps a **single reconciled record** of the watched train's location,
//! fed by several data sources of varying quality and availability.
//!
//! # Architecture
//!
//! Exactly one network topology is active at a time, chosen by a small state machine:
//!
//! - **WebSocket** → Primary, pushed updates from the backend feed
//! - **Polling** → Fallback, REST requests on a fixed interval after the socket fails
//! - **Simulation** → Last resort, walks the known route waypoints in order
//! - **Live Status** → Optional, station-level status from a third-party aggregator
//!
//! Every accepted update is merged into the record by the [`ReconciliationController`].
//!
//! # Sticky Merge
//!
//! Updates are partial. Coordinates always replace, other fields replace only
//! when the update carries them:
//!
//! > **A source that knows less never erases what a better source already said.**
//!
//! Chainage, speed, status, next station, ETA and delay survive a fallback to a
//! source that does not report them.
//!
//! # Usage
//!
//! ```ignore
//! use railwatch::location::{
//!     LifecycleConfig, LocationSources, ReconciliationController, Route,
//!     SubscriptionLifecycleManager, Waypoint,
//! };
//! use railwatch::location::polling::RestLocationClient;
//! use railwatch::location::websocket::TungsteniteConnector;
//!
//! let controller = Arc::new(ReconciliationController::new());
//! let sources = LocationSources::new(TungsteniteConnector, RestLocationClient::new(api, timeout)?);
//! let manager = SubscriptionLifecycleManager::new(controller.clone(), sources, LifecycleConfig::default());
//!
//! manager.watch("12001", route).await?;
//!
//! // Observe reconciled locations
//! controller.subscribe(|location| {
//!     println!("{} at {}", location.train_id, location.coordinates);
//! });
//!
//! // Observe source switches
//! let mut status = manager.subscribe_state();
//! while status.changed().await.is_ok() {
//!     println!("Now {}", status.borrow().state);
//! }
//! ```
//!
//! # Components
//!
//! - [`state`] - Core types: `TrainLocation`, `LocationUpdate`, `TrainId`, `WatchState`, `UpdateSource`
//! - [`controller`] - `ReconciliationController` with the sticky merge and subscriber fan-out
//! - [`lifecycle`] - `SubscriptionLifecycleManager` owning the source topology per watched train
//! - [`websocket`] - `WebSocketAdapter` for the push feed
//! - [`polling`] - `PollingAdapter` and `RestLocationClient` for the REST fallback
//! - [`simulation`] - `SimulationAdapter` walking the route
//! - [`live_status`] - `LiveStatusAdapter` for the optional aggregator feed
//! - [`provider`] - `LocationProvider` and `LocationBroadcaster` traits

mod controller;
mod error;
mod events;
pub mod lifecycle;
pub mod live_status;
mod logger;
mod payload;
pub mod polling;
mod provider;
mod route;
mod simulation;
mod state;
pub mod websocket;

pub use controller::{
    Listener, ReconciliationController, SubscriptionId, DEFAULT_BROADCAST_CAPACITY,
};
pub use error::{LocationError, SourceError};
pub use events::{EventSink, SourceEvent, SourceEventKind};
pub use lifecycle::{LifecycleConfig, LocationSources, SubscriptionLifecycleManager};
pub use payload::LocationPayload;
pub use provider::{LocationBroadcaster, LocationProvider};
pub use route::{Route, Waypoint};
pub use simulation::{RouteCursor, SimulationAdapter, SimulationConfig, DEFAULT_SIMULATION_INTERVAL};
pub use state::{
    Coordinates, LocationUpdate, SourceTopology, TrainId, TrainLocation, TrainStatus,
    UpdateSource, WatchState, WatchStatus,
};

// Periodic snapshot logger (DEBUG level only)
pub use logger::{spawn_location_logger, DEFAULT_LOG_INTERVAL};
