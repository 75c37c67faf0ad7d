//! Session driver - single writer for one watch session.
//!
//! The driver owns the session's adapters and is the only task that calls
//! `merge()` for them. All adapter events arrive on one channel, so merges are
//! applied in arrival order. The driver also runs the state machine: on a
//! source failure it stops the failed adapter, waits for its task to finish
//! and only then starts the next one, so at most one topology resource is
//! ever alive.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use super::transition::{self, SourceFailures};
use super::{LifecycleConfig, LocationSources};
use crate::location::controller::ReconciliationController;
use crate::location::error::{LocationError, SourceError};
use crate::location::events::{EventSink, SourceEvent, SourceEventKind, EVENT_CHANNEL_CAPACITY};
use crate::location::live_status::{LiveStatusAdapter, LiveStatusClient};
use crate::location::polling::{LocationClient, PollingAdapter};
use crate::location::route::Route;
use crate::location::simulation::SimulationAdapter;
use crate::location::state::{SourceTopology, TrainId, UpdateSource, WatchState, WatchStatus};
use crate::location::websocket::{FeedConnector, WebSocketAdapter};

/// Commands sent from the manager to a running session.
#[derive(Debug)]
pub(super) enum LifecycleCommand {
    /// Leave SimulationOnly and try the network again.
    Retry,
}

/// An adapter task and the token that stops it.
struct RunningAdapter {
    source: UpdateSource,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RunningAdapter {
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(source = %self.source, error = %e, "Adapter task ended abnormally");
        }
    }
}

/// Resolves when the running topology adapter's task ends.
///
/// Pending forever while no adapter is running.
async fn primary_exit(primary: &mut Option<RunningAdapter>) -> Result<(), JoinError> {
    match primary {
        Some(adapter) => (&mut adapter.handle).await,
        None => std::future::pending().await,
    }
}

pub(super) struct SessionDriver<W, P, L>
where
    W: FeedConnector,
    P: LocationClient,
    L: LiveStatusClient,
{
    session: u64,
    train_id: TrainId,
    route: Route,
    controller: Arc<ReconciliationController>,
    sources: LocationSources<W, P, L>,
    config: LifecycleConfig,
    status_tx: Arc<watch::Sender<WatchStatus>>,
    resources: Arc<AtomicUsize>,
    cancel: CancellationToken,
    events_tx: mpsc::Sender<SourceEvent>,
    events_rx: mpsc::Receiver<SourceEvent>,
    commands_rx: mpsc::Receiver<LifecycleCommand>,
    state: WatchState,
    failures: SourceFailures,
    primary: Option<RunningAdapter>,
    auxiliary: Option<RunningAdapter>,
}

impl<W, P, L> SessionDriver<W, P, L>
where
    W: FeedConnector,
    P: LocationClient,
    L: LiveStatusClient,
{
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        session: u64,
        train_id: TrainId,
        route: Route,
        controller: Arc<ReconciliationController>,
        sources: LocationSources<W, P, L>,
        config: LifecycleConfig,
        status_tx: Arc<watch::Sender<WatchStatus>>,
        resources: Arc<AtomicUsize>,
        cancel: CancellationToken,
        commands_rx: mpsc::Receiver<LifecycleCommand>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session,
            train_id,
            route,
            controller,
            sources,
            config,
            status_tx,
            resources,
            cancel,
            events_tx,
            events_rx,
            commands_rx,
            state: WatchState::Connecting,
            failures: SourceFailures::default(),
            primary: None,
            auxiliary: None,
        }
    }

    /// Start the driver as an async task.
    pub(super) fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        tracing::debug!(
            train_id = %self.train_id,
            session = self.session,
            "Watch session started"
        );

        self.start_topology(SourceTopology::WebSocketPrimary).await;
        self.start_live_status();

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some(command) = self.commands_rx.recv() => self.handle_command(command).await,
                Some(event) = self.events_rx.recv() => self.handle_event(event).await,
                result = primary_exit(&mut self.primary) => self.handle_primary_exit(result).await,
            }
        }

        self.shutdown().await;
        tracing::debug!(
            train_id = %self.train_id,
            session = self.session,
            "Watch session ended"
        );
    }

    async fn handle_command(&mut self, command: LifecycleCommand) {
        match command {
            LifecycleCommand::Retry => match transition::after_retry(self.state) {
                Some(next) => {
                    tracing::info!(train_id = %self.train_id, "Manual retry, reconnecting");
                    self.failures = SourceFailures::default();
                    self.enter(next).await;
                }
                None => {
                    tracing::debug!(
                        train_id = %self.train_id,
                        state = %self.state,
                        "Retry ignored outside SimulationOnly"
                    );
                }
            },
        }
    }

    async fn handle_event(&mut self, event: SourceEvent) {
        if !self.accepts(&event) {
            tracing::debug!(
                train_id = %self.train_id,
                source = %event.source,
                event_session = event.session,
                state = %self.state,
                "Discarding stale source event"
            );
            return;
        }

        match event.kind {
            SourceEventKind::Connected => {
                tracing::info!(train_id = %self.train_id, "WebSocket connected");
            }
            SourceEventKind::Update(update) => {
                // Rejections are logged by the controller and leave state untouched.
                if self.controller.merge(update, event.source).is_ok() {
                    if let Some(next) = transition::after_update(self.state, event.source) {
                        self.enter(next).await;
                    }
                }
            }
            SourceEventKind::Failed(error) => self.handle_failure(event.source, error).await,
        }
    }

    async fn handle_failure(&mut self, source: UpdateSource, error: SourceError) {
        let error = LocationError::unavailable(source, &error);
        tracing::warn!(
            train_id = %self.train_id,
            state = %self.state,
            error = %error,
            "Location source failed"
        );
        if let Some(next) = transition::after_failure(self.state, source, &mut self.failures) {
            self.enter(next).await;
        }
    }

    /// The topology adapter task ended on its own.
    ///
    /// A clean exit follows a `Failed` event that was already handled. A
    /// panicked task never reports, so it is treated as that source failing.
    async fn handle_primary_exit(&mut self, result: Result<(), JoinError>) {
        let Some(adapter) = self.primary.take() else {
            return;
        };

        match result {
            Ok(()) => {
                tracing::debug!(
                    train_id = %self.train_id,
                    source = %adapter.source,
                    "Adapter task finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    train_id = %self.train_id,
                    source = %adapter.source,
                    error = %e,
                    "Adapter task ended abnormally"
                );
                self.handle_failure(adapter.source, SourceError::TaskFailed(e.to_string()))
                    .await;
            }
        }
    }

    /// Events must come from this session and from a source that is running.
    fn accepts(&self, event: &SourceEvent) -> bool {
        if event.session != self.session {
            return false;
        }
        match event.source {
            UpdateSource::LiveStatus => self.auxiliary.is_some(),
            source => self.state.primary_source() == Some(source),
        }
    }

    async fn enter(&mut self, next: WatchState) {
        let previous = self.state;
        self.state = next;

        match next {
            WatchState::Connecting => self.start_topology(SourceTopology::WebSocketPrimary).await,
            WatchState::PollingFallback => {
                self.start_topology(SourceTopology::PollingFallback).await
            }
            WatchState::SimulationOnly => self.start_topology(SourceTopology::SimulationOnly).await,
            // The socket that delivered the first update keeps running.
            WatchState::WebSocketPrimary => {}
            WatchState::Idle => self.stop_topology().await,
        }

        tracing::info!(
            train_id = %self.train_id,
            from = %previous,
            to = %next,
            "Source topology transition"
        );
        self.publish();
    }

    /// Replace the running topology adapter with one for `topology`.
    async fn start_topology(&mut self, topology: SourceTopology) {
        self.stop_topology().await;

        let source = topology.source();
        let cancel = self.cancel.child_token();
        let sink = EventSink::new(self.session, source, self.events_tx.clone(), cancel.clone())
            .tracking(Arc::clone(&self.resources));

        let handle = match topology {
            SourceTopology::WebSocketPrimary => WebSocketAdapter::new(
                Arc::clone(&self.sources.connector),
                self.train_id.clone(),
                &self.config.websocket,
                sink,
            )
            .start(),
            SourceTopology::PollingFallback => PollingAdapter::new(
                Arc::clone(&self.sources.client),
                self.train_id.clone(),
                self.config.polling.clone(),
                sink,
            )
            .start(),
            SourceTopology::SimulationOnly => {
                SimulationAdapter::new(self.route.clone(), self.config.simulation.clone(), sink)
                    .start()
            }
        };

        self.primary = Some(RunningAdapter {
            source,
            cancel,
            handle,
        });
    }

    async fn stop_topology(&mut self) {
        if let Some(adapter) = self.primary.take() {
            adapter.stop().await;
        }
    }

    fn start_live_status(&mut self) {
        let Some(client) = self.sources.live_status.as_ref() else {
            return;
        };

        let cancel = self.cancel.child_token();
        let sink = EventSink::new(
            self.session,
            UpdateSource::LiveStatus,
            self.events_tx.clone(),
            cancel.clone(),
        );
        let handle = LiveStatusAdapter::new(
            Arc::clone(client),
            self.train_id.clone(),
            self.config.live_status_interval,
            sink,
        )
        .start();

        self.auxiliary = Some(RunningAdapter {
            source: UpdateSource::LiveStatus,
            cancel,
            handle,
        });
    }

    fn publish(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.status_tx.send_replace(WatchStatus {
            state: self.state,
            train_id: Some(self.train_id.clone()),
        });
    }

    async fn shutdown(&mut self) {
        self.stop_topology().await;
        if let Some(adapter) = self.auxiliary.take() {
            adapter.stop().await;
        }
    }
}
