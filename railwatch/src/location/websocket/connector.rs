//! Socket connector trait and tokio-tungstenite implementation.
//!
//! The [`FeedConnector`] trait abstracts over how the push feed is opened so
//! the adapter can be driven by scripted feeds in tests. [`TungsteniteConnector`]
//! is the production implementation.

use std::future::Future;

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::location::error::SourceError;

/// An open push feed delivering text frames.
pub trait LocationFeed: Send + 'static {
    /// Next text frame. `None` when the feed has ended cleanly.
    fn next_text(&mut self) -> impl Future<Output = Option<Result<String, SourceError>>> + Send;

    /// Close the feed. Safe to call on an already closed feed.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens push feeds.
pub trait FeedConnector: Send + Sync + 'static {
    type Feed: LocationFeed;

    /// Open a feed at `url`.
    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Feed, SourceError>> + Send;
}

/// Production connector using tokio-tungstenite.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

impl FeedConnector for TungsteniteConnector {
    type Feed = TungsteniteFeed;

    async fn connect(&self, url: &str) -> Result<TungsteniteFeed, SourceError> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| SourceError::Connect(e.to_string()))?;

        tracing::debug!(
            url,
            status = %response.status(),
            "WebSocket handshake complete"
        );

        Ok(TungsteniteFeed {
            stream,
            closed: false,
        })
    }
}

/// Push feed over a tungstenite WebSocket stream.
pub struct TungsteniteFeed {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl LocationFeed for TungsteniteFeed {
    async fn next_text(&mut self) -> Option<Result<String, SourceError>> {
        if self.closed {
            return None;
        }

        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        tracing::debug!("Dropping non UTF-8 binary frame");
                    }
                },
                Ok(Message::Close(frame)) => {
                    self.closed = true;
                    let reason = frame
                        .map(|f| format!("{} {}", f.code, f.reason))
                        .unwrap_or_else(|| "closed by server".to_string());
                    return Some(Err(SourceError::Closed(reason)));
                }
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => {}
                Err(e) => {
                    self.closed = true;
                    return Some(Err(SourceError::Closed(e.to_string())));
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "WebSocket close handshake failed");
        }
    }
}
