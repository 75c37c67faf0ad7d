//! Railwatch - live train location reconciliation
//!
//! This library tracks one train at a time and keeps a single reconciled
//! location record for it, fed by a WebSocket push feed, a REST polling
//! fallback, a route simulation of last resort, and an optional third-party
//! live-status feed.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use railwatch::config::ConfigFile;
//! use railwatch::location::{Route, Waypoint};
//! use railwatch::service::TrainWatchService;
//!
//! let service = TrainWatchService::from_config(&ConfigFile::load()?)?;
//!
//! let route = Route::new(vec![
//!     Waypoint::station("New Delhi", 28.6139, 77.2090),
//!     Waypoint::station("Kanpur Central", 26.4499, 80.3319),
//!     Waypoint::station("Howrah", 22.5726, 88.3639),
//! ]);
//! service.watch("12001", route).await?;
//! ```

pub mod config;
pub mod location;
pub mod logging;
pub mod service;

/// Version of the Railwatch library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
