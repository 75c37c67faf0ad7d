//! Live-status adapter - third-party running status aggregator.
//!
//! An optional, lower-frequency source that runs alongside whichever topology
//! is active. It reports station-level status (current and next station,
//! delay, speed, ETA) which is mapped into a partial update and merged like
//! any other source.
//!
//! Failures are logged and the adapter keeps polling at its own interval;
//! they never cause a topology transition.

mod client;
mod mapping;

pub use client::{LiveStatusClient, NoLiveStatus, RapidApiClient};
pub use mapping::{map_status, parse_live_status, LiveStatus, Station};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::error::SourceError;
use super::events::{EventSink, SourceEventKind};
use super::state::TrainId;

/// Default aggregator base URL.
pub const DEFAULT_LIVE_STATUS_BASE_URL: &str = crate::config::DEFAULT_LIVE_STATUS_BASE_URL;

/// Default RapidAPI host header.
pub const DEFAULT_LIVE_STATUS_HOST: &str = crate::config::DEFAULT_LIVE_STATUS_HOST;

/// Default interval between live-status requests (60 seconds).
pub const DEFAULT_LIVE_STATUS_INTERVAL: Duration =
    Duration::from_secs(crate::config::DEFAULT_LIVE_STATUS_INTERVAL_SECS);

/// Default live-status request timeout (10 seconds).
pub const DEFAULT_LIVE_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the live-status feed.
#[derive(Debug, Clone)]
pub struct LiveStatusConfig {
    /// RapidAPI key. Required when the feed is enabled.
    pub api_key: Option<String>,

    pub base_url: String,

    /// Value of the `X-RapidAPI-Host` header.
    pub host: String,

    /// Time between requests.
    pub interval: Duration,

    pub request_timeout: Duration,
}

impl Default for LiveStatusConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_LIVE_STATUS_BASE_URL.to_string(),
            host: DEFAULT_LIVE_STATUS_HOST.to_string(),
            interval: DEFAULT_LIVE_STATUS_INTERVAL,
            request_timeout: DEFAULT_LIVE_STATUS_TIMEOUT,
        }
    }
}

impl LiveStatusConfig {
    /// Create configuration from the config file settings.
    pub fn from_config(config: &crate::config::ConfigFile) -> Self {
        Self {
            api_key: config.live_status.api_key.clone(),
            base_url: config.live_status.base_url.clone(),
            host: config.live_status.host.clone(),
            interval: Duration::from_secs(config.live_status.interval_secs),
            request_timeout: Duration::from_millis(config.api.request_timeout_ms)
                .max(DEFAULT_LIVE_STATUS_TIMEOUT),
        }
    }
}

/// Live-status adapter for one train.
pub struct LiveStatusAdapter<C: LiveStatusClient> {
    client: Arc<C>,
    train_id: TrainId,
    interval: Duration,
    sink: EventSink,
}

impl<C: LiveStatusClient> LiveStatusAdapter<C> {
    pub fn new(client: Arc<C>, train_id: TrainId, interval: Duration, sink: EventSink) -> Self {
        Self {
            client,
            train_id,
            interval,
            sink,
        }
    }

    /// Start the adapter as an async task.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        tracing::info!(
            train_id = %self.train_id,
            interval_secs = self.interval.as_secs(),
            "Live status adapter started"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_errors: u32 = 0;

        loop {
            tokio::select! {
                _ = self.sink.cancelled() => break,
                _ = interval.tick() => {}
            }

            let result = tokio::select! {
                _ = self.sink.cancelled() => break,
                result = self.client.fetch_status(&self.train_id) => result,
            };

            match result {
                Ok(status) => {
                    consecutive_errors = 0;
                    let update = status.to_update();
                    if !self.sink.emit(SourceEventKind::Update(update)).await {
                        break;
                    }
                }
                Err(SourceError::QuotaExceeded) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        train_id = %self.train_id,
                        consecutive_errors,
                        "Live status quota exceeded"
                    );
                }
                Err(SourceError::TrainNotFound(_)) | Err(SourceError::NoData(_)) => {
                    // Not running today, or not tracked by the aggregator.
                    tracing::debug!(train_id = %self.train_id, "No live status for train");
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        train_id = %self.train_id,
                        error = %e,
                        consecutive_errors,
                        "Failed to fetch live status"
                    );
                }
            }
        }

        tracing::info!(train_id = %self.train_id, "Live status adapter stopped");
    }
}
