//! Polling source adapter - request/response fallback for one train.
//!
//! The [`PollingAdapter`] fetches the train's location on a fixed interval
//! and forwards each result to the session driver.
//!
//! # Design
//!
//! Follows the same pattern as the other adapters:
//! - `new()` + `start()` → spawns async task
//! - Async `run()` loop with `tokio::time::interval`
//! - Cancellation through the adapter's [`EventSink`]
//!
//! Requests are single-flight: the loop awaits each request (bounded by the
//! request timeout) before waiting for the next tick, and late ticks are
//! delayed rather than bunched. The first request fires immediately.
//!
//! Failure is fail-fast. The first failed request of any kind (transport
//! error, non-2xx status, timeout, unparseable body) is reported once and the
//! adapter stops, leaving the driver to move to simulation.

mod client;

pub use client::{LocationClient, RestLocationClient};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::error::SourceError;
use super::events::{EventSink, SourceEventKind};
use super::state::{LocationUpdate, TrainId};

/// Default polling interval (3 seconds).
pub const DEFAULT_POLLING_INTERVAL: Duration =
    Duration::from_millis(crate::config::DEFAULT_POLLING_INTERVAL_MS);

/// Default request timeout (5 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration =
    Duration::from_millis(crate::config::DEFAULT_REQUEST_TIMEOUT_MS);

/// Configuration for the polling adapter.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Time between requests.
    pub interval: Duration,

    /// Upper bound for a single request.
    pub request_timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLLING_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl PollingConfig {
    /// Create configuration from the config file settings.
    pub fn from_config(config: &crate::config::ConfigFile) -> Self {
        Self {
            interval: Duration::from_millis(config.polling.interval_ms),
            request_timeout: Duration::from_millis(config.api.request_timeout_ms),
        }
    }
}

/// Polling adapter for one train.
pub struct PollingAdapter<C: LocationClient> {
    client: Arc<C>,
    train_id: TrainId,
    config: PollingConfig,
    sink: EventSink,
}

impl<C: LocationClient> PollingAdapter<C> {
    pub fn new(client: Arc<C>, train_id: TrainId, config: PollingConfig, sink: EventSink) -> Self {
        Self {
            client,
            train_id,
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

    async fn run(self) {
        tracing::info!(
            train_id = %self.train_id,
            interval_ms = self.config.interval.as_millis() as u64,
            timeout_ms = self.config.request_timeout.as_millis() as u64,
            "Polling adapter started"
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.sink.cancelled() => break,
                _ = interval.tick() => {}
            }

            let result = tokio::select! {
                _ = self.sink.cancelled() => {
                    tracing::debug!(train_id = %self.train_id, "In-flight location request abandoned");
                    break;
                }
                result = self.poll_once() => result,
            };

            match result {
                Ok(update) => {
                    if !self.sink.emit(SourceEventKind::Update(update)).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        train_id = %self.train_id,
                        error = %e,
                        "Location request failed"
                    );
                    self.sink.emit(SourceEventKind::Failed(e)).await;
                    break;
                }
            }
        }

        tracing::info!(train_id = %self.train_id, "Polling adapter stopped");
    }

    /// Issue one request bounded by the request timeout.
    async fn poll_once(&self) -> Result<LocationUpdate, SourceError> {
        let payload = tokio::time::timeout(
            self.config.request_timeout,
            self.client.fetch_location(&self.train_id),
        )
        .await
        .map_err(|_| SourceError::Timeout(self.config.request_timeout.as_millis() as u64))??;

        Ok(payload.into_update())
    }
}
