//! Location client trait and REST implementation.
//!
//! The [`LocationClient`] trait abstracts the request/response fetch so the
//! polling adapter can be exercised with mock clients. [`RestLocationClient`]
//! calls `GET <api-base>/api/trains/{id}/location` via `reqwest`.

use std::future::Future;
use std::time::Duration;

use crate::location::error::{LocationError, SourceError};
use crate::location::payload::LocationPayload;
use crate::location::state::TrainId;

/// Trait for fetching the current location of one train.
pub trait LocationClient: Send + Sync + 'static {
    /// Fetch the latest location payload for `train_id`.
    fn fetch_location(
        &self,
        train_id: &TrainId,
    ) -> impl Future<Output = Result<LocationPayload, SourceError>> + Send;
}

/// REST client for the tracking backend.
///
/// Uses a reusable `reqwest::Client` with connection pooling and a request
/// timeout.
pub struct RestLocationClient {
    http: reqwest::Client,
    api_base: String,
    timeout: Duration,
}

impl RestLocationClient {
    /// Create a client for `api_base` (e.g. `http://localhost:3001`).
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, LocationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocationError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.into(),
            timeout,
        })
    }

    /// Location endpoint for a train.
    pub fn location_url(&self, train_id: &TrainId) -> String {
        location_url(&self.api_base, train_id)
    }
}

impl LocationClient for RestLocationClient {
    async fn fetch_location(&self, train_id: &TrainId) -> Result<LocationPayload, SourceError> {
        let url = self.location_url(train_id);

        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(self.timeout.as_millis() as u64)
            } else {
                SourceError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let payload: LocationPayload = serde_json::from_slice(&bytes)?;

        tracing::trace!(train_id = %train_id, url = %url, "Location fetched");
        Ok(payload)
    }
}

pub(crate) fn location_url(api_base: &str, train_id: &TrainId) -> String {
    format!(
        "{}/api/trains/{}/location",
        api_base.trim_end_matches('/'),
        train_id
    )
}
