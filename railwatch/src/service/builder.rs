//! Builder functions for the production clients behind [`super::TrainWatchService`].
//!
//! Each function turns one part of [`ConfigFile`] into a ready client so the
//! facade only wires results together.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigFile;
use crate::location::live_status::{LiveStatusConfig, RapidApiClient};
use crate::location::polling::RestLocationClient;
use crate::location::websocket::TungsteniteConnector;
use crate::location::{LocationError, LocationSources};

/// Sources used by the production service.
pub type ProductionSources = LocationSources<TungsteniteConnector, RestLocationClient, RapidApiClient>;

/// Create the REST client used by the polling fallback.
pub fn create_location_client(config: &ConfigFile) -> Result<RestLocationClient, LocationError> {
    RestLocationClient::new(
        config.api.base_url.clone(),
        Duration::from_millis(config.api.request_timeout_ms),
    )
}

/// Create the live status client, or `None` when the feed is disabled.
pub fn create_live_status_client(
    config: &ConfigFile,
) -> Result<Option<RapidApiClient>, LocationError> {
    if !config.live_status.enabled {
        tracing::debug!("Live status feed disabled");
        return Ok(None);
    }

    let client = RapidApiClient::new(&LiveStatusConfig::from_config(config))?;
    tracing::info!(host = %config.live_status.host, "Live status feed enabled");
    Ok(Some(client))
}

/// Create all sources from configuration.
pub fn create_sources(config: &ConfigFile) -> Result<ProductionSources, LocationError> {
    let client = create_location_client(config)?;
    let live_status = create_live_status_client(config)?;

    Ok(LocationSources {
        connector: Arc::new(TungsteniteConnector),
        client: Arc::new(client),
        live_status: live_status.map(Arc::new),
    })
}
