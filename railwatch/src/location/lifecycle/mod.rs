//! Subscription lifecycle manager - one source topology per watched train.
//!
//! The [`SubscriptionLifecycleManager`] binds adapters to the watched train
//! and guarantees clean teardown when the train changes.
//!
//! # Architecture
//!
//! Each `watch()` opens a *session* with its own generation number,
//! cancellation token and driver task:
//!
//! ```text
//!                 ┌─────────────── session N ───────────────┐
//!  WebSocket  ─┐  │                                         │
//!  Polling    ─┼──► events (mpsc) ──► SessionDriver ──► ReconciliationController::merge
//!  Simulation ─┤  │                      │                  │
//!  LiveStatus ─┘  │                      └─► WatchStatus (watch channel)
//!                 └─────────────────────────────────────────┘
//! ```
//!
//! Only one of WebSocket, Polling or Simulation runs at a time. The driver
//! cancels the running adapter and awaits its task before starting the next.
//! The optional live-status adapter runs for the whole session beside it.
//!
//! Switching trains cancels the session token, awaits the driver (which awaits
//! its adapters), clears the controller and only then seeds the new train.
//! Events carry their session number; anything from an older session, or
//! from a source that is no longer the active topology, is discarded before
//! reaching `merge()`.

mod driver;
mod transition;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use self::driver::{LifecycleCommand, SessionDriver};
use super::controller::ReconciliationController;
use super::error::LocationError;
use super::live_status::{
    LiveStatusClient, LiveStatusConfig, NoLiveStatus, DEFAULT_LIVE_STATUS_INTERVAL,
};
use super::polling::{LocationClient, PollingConfig};
use super::route::Route;
use super::simulation::SimulationConfig;
use super::state::{LocationUpdate, SourceTopology, TrainId, WatchState, WatchStatus};
use super::websocket::{FeedConnector, WebSocketConfig};

/// Configuration for the lifecycle manager and the adapters it starts.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub websocket: WebSocketConfig,
    pub polling: PollingConfig,
    pub simulation: SimulationConfig,
    /// Interval of the optional live-status adapter.
    pub live_status_interval: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            websocket: WebSocketConfig::default(),
            polling: PollingConfig::default(),
            simulation: SimulationConfig::default(),
            live_status_interval: DEFAULT_LIVE_STATUS_INTERVAL,
        }
    }
}

impl LifecycleConfig {
    /// Create configuration from the config file settings.
    ///
    /// Fails with `Configuration` when the settings do not validate.
    pub fn from_config(config: &crate::config::ConfigFile) -> Result<Self, LocationError> {
        config.validate()?;
        let lifecycle = Self {
            websocket: WebSocketConfig::from_config(config),
            polling: PollingConfig::from_config(config),
            simulation: SimulationConfig::from_config(config),
            live_status_interval: LiveStatusConfig::from_config(config).interval,
        };
        lifecycle.validate()?;
        Ok(lifecycle)
    }

    /// Check that every adapter interval and timeout is non-zero.
    pub fn validate(&self) -> Result<(), LocationError> {
        let durations = [
            ("websocket connect timeout", self.websocket.connect_timeout),
            ("polling interval", self.polling.interval),
            ("polling request timeout", self.polling.request_timeout),
            ("simulation interval", self.simulation.interval),
            ("live status interval", self.live_status_interval),
        ];

        match durations.iter().find(|(_, duration)| duration.is_zero()) {
            Some((name, _)) => Err(LocationError::Configuration(format!(
                "{} must be greater than zero",
                name
            ))),
            None => Ok(()),
        }
    }
}

/// Clients used to build a session's adapters.
pub struct LocationSources<W, P, L = NoLiveStatus> {
    pub connector: Arc<W>,
    pub client: Arc<P>,
    pub live_status: Option<Arc<L>>,
}

impl<W, P> LocationSources<W, P, NoLiveStatus> {
    /// Sources without a live-status feed.
    pub fn new(connector: W, client: P) -> Self {
        Self {
            connector: Arc::new(connector),
            client: Arc::new(client),
            live_status: None,
        }
    }
}

impl<W, P, L> LocationSources<W, P, L> {
    /// Add a live-status feed.
    pub fn with_live_status<L2>(self, live_status: L2) -> LocationSources<W, P, L2> {
        LocationSources {
            connector: self.connector,
            client: self.client,
            live_status: Some(Arc::new(live_status)),
        }
    }
}

impl<W, P, L> Clone for LocationSources<W, P, L> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            client: Arc::clone(&self.client),
            live_status: self.live_status.clone(),
        }
    }
}

/// A running watch session.
///
/// Dropping it cancels the session, so a manager dropped without `stop()`
/// still ends its driver and adapters.
struct ActiveWatch {
    session: u64,
    train_id: TrainId,
    cancel: CancellationToken,
    commands: mpsc::Sender<LifecycleCommand>,
    driver: JoinHandle<()>,
}

impl Drop for ActiveWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Binds source adapters to the watched train.
pub struct SubscriptionLifecycleManager<W, P, L = NoLiveStatus>
where
    W: FeedConnector,
    P: LocationClient,
    L: LiveStatusClient,
{
    controller: Arc<ReconciliationController>,
    sources: LocationSources<W, P, L>,
    config: LifecycleConfig,
    active: Mutex<Option<ActiveWatch>>,
    status_tx: Arc<watch::Sender<WatchStatus>>,
    resources: Arc<AtomicUsize>,
    next_session: AtomicU64,
}

impl<W, P, L> SubscriptionLifecycleManager<W, P, L>
where
    W: FeedConnector,
    P: LocationClient,
    L: LiveStatusClient,
{
    pub fn new(
        controller: Arc<ReconciliationController>,
        sources: LocationSources<W, P, L>,
        config: LifecycleConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(WatchStatus::default());
        Self {
            controller,
            sources,
            config,
            active: Mutex::new(None),
            status_tx: Arc::new(status_tx),
            resources: Arc::new(AtomicUsize::new(0)),
            next_session: AtomicU64::new(1),
        }
    }

    /// Start watching `train_id`, seeded from the route's first waypoint.
    ///
    /// Fails with `InvalidTrain` on an empty identifier or an empty route.
    pub async fn watch(&self, train_id: &str, route: Route) -> Result<(), LocationError> {
        let train = TrainId::new(train_id)?;
        let seed = route.origin_update().ok_or_else(|| {
            LocationError::InvalidTrain(format!("no known location for train {}", train))
        })?;
        self.watch_with_seed(train_id, route, seed).await
    }

    /// Start watching `train_id`, seeded from its last known location.
    ///
    /// Watching the train that is already watched is a no-op. Watching a
    /// different train tears the previous session down completely first.
    pub async fn watch_with_seed(
        &self,
        train_id: &str,
        route: Route,
        seed: LocationUpdate,
    ) -> Result<(), LocationError> {
        let train_id = TrainId::new(train_id)?;
        self.config.validate()?;
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref() {
            if current.train_id == train_id {
                tracing::debug!(train_id = %train_id, "Already watching train");
                return Ok(());
            }
        }

        if let Some(previous) = active.take() {
            tracing::info!(
                from = %previous.train_id,
                to = %train_id,
                "Switching watched train"
            );
            self.teardown(previous).await;
        }

        self.controller.seed(&train_id, seed)?;

        let session = self.next_session.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (commands_tx, commands_rx) = mpsc::channel(4);

        self.status_tx.send_replace(WatchStatus {
            state: WatchState::Connecting,
            train_id: Some(train_id.clone()),
        });

        let driver = SessionDriver::new(
            session,
            train_id.clone(),
            route,
            Arc::clone(&self.controller),
            self.sources.clone(),
            self.config.clone(),
            Arc::clone(&self.status_tx),
            Arc::clone(&self.resources),
            cancel.clone(),
            commands_rx,
        )
        .start();

        tracing::info!(train_id = %train_id, session, "Watching train");

        *active = Some(ActiveWatch {
            session,
            train_id,
            cancel,
            commands: commands_tx,
            driver,
        });
        Ok(())
    }

    /// Stop watching. Safe to call repeatedly.
    pub async fn stop(&self) {
        let mut active = self.active.lock().await;
        match active.take() {
            Some(previous) => self.teardown(previous).await,
            None => tracing::debug!("Stop requested while idle"),
        }
    }

    /// Leave SimulationOnly and try the network again.
    ///
    /// Returns false when there is no session or it is not in SimulationOnly.
    pub async fn retry(&self) -> bool {
        let active = self.active.lock().await;
        let Some(current) = active.as_ref() else {
            return false;
        };
        if self.state() != WatchState::SimulationOnly {
            tracing::debug!(state = %self.state(), "Retry ignored");
            return false;
        }
        current.commands.send(LifecycleCommand::Retry).await.is_ok()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WatchState {
        self.status_tx.borrow().state
    }

    /// Active source topology, `None` when idle.
    pub fn topology(&self) -> Option<SourceTopology> {
        self.state().topology()
    }

    /// Train currently watched.
    pub fn watched_train(&self) -> Option<TrainId> {
        self.status_tx.borrow().train_id.clone()
    }

    /// Observe lifecycle state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<WatchStatus> {
        self.status_tx.subscribe()
    }

    /// Number of topology sockets or timers currently alive.
    pub fn live_resources(&self) -> usize {
        self.resources.load(Ordering::SeqCst)
    }

    pub fn controller(&self) -> &Arc<ReconciliationController> {
        &self.controller
    }

    async fn teardown(&self, mut previous: ActiveWatch) {
        previous.cancel.cancel();
        if let Err(e) = (&mut previous.driver).await {
            tracing::warn!(
                train_id = %previous.train_id,
                session = previous.session,
                error = %e,
                "Watch session ended abnormally"
            );
        }

        self.controller.clear();
        self.status_tx.send_replace(WatchStatus::default());

        tracing::info!(
            train_id = %previous.train_id,
            session = previous.session,
            "Stopped watching train"
        );
    }
}
