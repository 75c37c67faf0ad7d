//! High-level service facade for Railwatch.
//!
//! This module wires the location components from a
//! [`ConfigFile`](crate::config::ConfigFile), following the Facade pattern.
//! The facade owns the controller and the lifecycle manager; nothing is held
//! in a global.
//!
//! # Example
//!
//! ```ignore
//! use railwatch::config::ConfigFile;
//! use railwatch::service::TrainWatchService;
//!
//! let config = ConfigFile::load()?;
//! let service = TrainWatchService::from_config(&config)?;
//!
//! service.watch("12001", route).await?;
//! let mut status = service.subscribe_state();
//! ```

mod builder;
mod facade;

pub use builder::{create_live_status_client, create_location_client, create_sources, ProductionSources};
pub use facade::TrainWatchService;
