//! Railwatch service facade implementation.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::{self, ProductionSources};
use crate::config::ConfigFile;
use crate::location::live_status::RapidApiClient;
use crate::location::polling::RestLocationClient;
use crate::location::websocket::TungsteniteConnector;
use crate::location::{
    spawn_location_logger, LifecycleConfig, LocationError, LocationUpdate,
    ReconciliationController, Route, SubscriptionLifecycleManager, TrainLocation, WatchState,
    WatchStatus, DEFAULT_LOG_INTERVAL,
};

type ProductionManager =
    SubscriptionLifecycleManager<TungsteniteConnector, RestLocationClient, RapidApiClient>;

/// High-level facade for watching trains.
///
/// Owns the reconciliation controller, the lifecycle manager built on the
/// production clients, and the token that stops background tasks.
///
/// # Example
///
/// ```ignore
/// use railwatch::config::ConfigFile;
/// use railwatch::service::TrainWatchService;
///
/// let service = TrainWatchService::from_config(&ConfigFile::load()?)?;
/// service.watch("12001", route).await?;
///
/// if let Some(location) = service.snapshot() {
///     println!("{} at {}", location.train_id, location.coordinates);
/// }
///
/// service.shutdown().await;
/// ```
pub struct TrainWatchService {
    controller: Arc<ReconciliationController>,
    manager: ProductionManager,
    cancellation: CancellationToken,
    logger: Option<JoinHandle<()>>,
}

impl TrainWatchService {
    /// Create the service from configuration.
    ///
    /// Must be called inside a Tokio runtime. Fails with `Configuration` when
    /// the config does not validate or a client cannot be built.
    pub fn from_config(config: &ConfigFile) -> Result<Self, LocationError> {
        let lifecycle = LifecycleConfig::from_config(config)?;
        let sources = builder::create_sources(config)?;
        Ok(Self::with_sources(sources, lifecycle))
    }

    fn with_sources(sources: ProductionSources, config: LifecycleConfig) -> Self {
        let controller = Arc::new(ReconciliationController::new());
        let manager =
            SubscriptionLifecycleManager::new(Arc::clone(&controller), sources, config);
        let cancellation = CancellationToken::new();

        let logger = tracing::enabled!(tracing::Level::DEBUG).then(|| {
            spawn_location_logger(
                Arc::clone(&controller),
                manager.subscribe_state(),
                cancellation.child_token(),
                DEFAULT_LOG_INTERVAL,
            )
        });

        tracing::info!(version = crate::VERSION, "Train watch service ready");

        Self {
            controller,
            manager,
            cancellation,
            logger,
        }
    }

    /// Start watching a train from the first waypoint of its route.
    pub async fn watch(&self, train_id: &str, route: Route) -> Result<(), LocationError> {
        self.manager.watch(train_id, route).await
    }

    /// Start watching a train from its last known location.
    pub async fn watch_with_seed(
        &self,
        train_id: &str,
        route: Route,
        seed: LocationUpdate,
    ) -> Result<(), LocationError> {
        self.manager.watch_with_seed(train_id, route, seed).await
    }

    /// Stop watching the current train.
    pub async fn stop(&self) {
        self.manager.stop().await;
    }

    /// Leave simulation and try the network again.
    pub async fn retry(&self) -> bool {
        self.manager.retry().await
    }

    /// Current reconciled location.
    pub fn snapshot(&self) -> Option<Arc<TrainLocation>> {
        self.controller.current_snapshot()
    }

    pub fn controller(&self) -> &Arc<ReconciliationController> {
        &self.controller
    }

    pub fn state(&self) -> WatchState {
        self.manager.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WatchStatus> {
        self.manager.subscribe_state()
    }

    /// Stop watching and end all background tasks.
    pub async fn shutdown(mut self) {
        self.manager.stop().await;
        self.cancellation.cancel();
        if let Some(logger) = self.logger.take() {
            if let Err(e) = logger.await {
                tracing::warn!(error = %e, "Location logger ended abnormally");
            }
        }
        tracing::info!("Train watch service stopped");
    }
}

impl Drop for TrainWatchService {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
