//! WebSocket source adapter - push feed for one train.
//!
//! The [`WebSocketAdapter`] opens one socket at `<ws-base>/ws/trains/{id}` and
//! forwards every well-formed `location_update` to the session driver. Other
//! message types and malformed frames are logged and dropped; they never
//! affect state.
//!
//! A failed connect, a stream error or a close is reported once as
//! [`SourceEventKind::Failed`] and the adapter ends. The driver reacts by
//! switching to the polling fallback.

mod connector;
mod protocol;

pub use connector::{FeedConnector, LocationFeed, TungsteniteConnector, TungsteniteFeed};
pub use protocol::{parse_frame, FeedFrame, ERROR_MESSAGE, LOCATION_UPDATE};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::error::SourceError;
use super::events::{EventSink, SourceEventKind};
use super::state::TrainId;

/// Default WebSocket base URL.
pub const DEFAULT_WS_BASE_URL: &str = crate::config::DEFAULT_WS_BASE_URL;

/// Default upper bound for opening the socket (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration =
    Duration::from_millis(crate::config::DEFAULT_REQUEST_TIMEOUT_MS);

/// Configuration for the WebSocket adapter.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Base URL, e.g. `wss://tracking.example.com`.
    pub base_url: String,

    /// Upper bound for the connect and handshake.
    pub connect_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WS_BASE_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl WebSocketConfig {
    /// Create configuration from the config file settings.
    ///
    /// The connect timeout shares the API request timeout.
    pub fn from_config(config: &crate::config::ConfigFile) -> Self {
        Self {
            base_url: config.websocket.base_url.clone(),
            connect_timeout: Duration::from_millis(config.api.request_timeout_ms),
        }
    }

    /// Feed URL for a train.
    pub fn feed_url(&self, train_id: &TrainId) -> String {
        format!(
            "{}/ws/trains/{}",
            self.base_url.trim_end_matches('/'),
            train_id
        )
    }
}

/// WebSocket adapter for one train.
pub struct WebSocketAdapter<C: FeedConnector> {
    connector: Arc<C>,
    train_id: TrainId,
    url: String,
    connect_timeout: Duration,
    sink: EventSink,
}

impl<C: FeedConnector> WebSocketAdapter<C> {
    pub fn new(
        connector: Arc<C>,
        train_id: TrainId,
        config: &WebSocketConfig,
        sink: EventSink,
    ) -> Self {
        let url = config.feed_url(&train_id);
        Self {
            connector,
            train_id,
            url,
            connect_timeout: config.connect_timeout,
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
            url = %self.url,
            "WebSocket adapter started"
        );

        let connected = tokio::select! {
            _ = self.sink.cancelled() => {
                tracing::debug!(train_id = %self.train_id, "WebSocket connect abandoned");
                return;
            }
            result = tokio::time::timeout(
                self.connect_timeout,
                self.connector.connect(&self.url),
            ) => {
                result.unwrap_or_else(|_| {
                    Err(SourceError::Timeout(self.connect_timeout.as_millis() as u64))
                })
            }
        };

        let mut feed = match connected {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(train_id = %self.train_id, error = %e, "WebSocket connection failed");
                self.sink.emit(SourceEventKind::Failed(e)).await;
                return;
            }
        };

        self.sink.emit(SourceEventKind::Connected).await;

        loop {
            let next = tokio::select! {
                _ = self.sink.cancelled() => {
                    feed.close().await;
                    break;
                }
                next = feed.next_text() => next,
            };

            match next {
                Some(Ok(text)) => {
                    if !self.handle_text(&text).await {
                        feed.close().await;
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(train_id = %self.train_id, error = %e, "WebSocket feed failed");
                    feed.close().await;
                    self.sink.emit(SourceEventKind::Failed(e)).await;
                    break;
                }
                None => {
                    tracing::warn!(train_id = %self.train_id, "WebSocket feed ended");
                    self.sink
                        .emit(SourceEventKind::Failed(SourceError::Closed(
                            "stream ended".to_string(),
                        )))
                        .await;
                    break;
                }
            }
        }

        tracing::info!(train_id = %self.train_id, "WebSocket adapter stopped");
    }

    /// Handle one text frame. Returns false once the sink is inactive.
    async fn handle_text(&self, text: &str) -> bool {
        match parse_frame(text) {
            Ok(FeedFrame::Location(update)) => {
                if let Some(other) = update.train_id.as_ref().filter(|id| **id != self.train_id) {
                    tracing::debug!(
                        train_id = %self.train_id,
                        message_train = %other,
                        "Dropping location update for another train"
                    );
                    return true;
                }
                self.sink.emit(SourceEventKind::Update(update)).await
            }
            Ok(FeedFrame::Other { kind, data }) if kind == ERROR_MESSAGE => {
                tracing::warn!(train_id = %self.train_id, data = ?data, "WebSocket feed reported an error");
                true
            }
            Ok(FeedFrame::Other { kind, .. }) => {
                tracing::debug!(train_id = %self.train_id, kind = %kind, "Ignoring WebSocket message");
                true
            }
            Err(e) => {
                tracing::debug!(train_id = %self.train_id, error = %e, "Dropping malformed WebSocket frame");
                true
            }
        }
    }
}
