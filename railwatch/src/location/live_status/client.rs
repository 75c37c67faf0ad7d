//! Live-status client trait and RapidAPI implementation.

use std::future::Future;

use chrono::Utc;
use serde::Serialize;

use super::mapping::{parse_live_status, LiveStatus};
use super::LiveStatusConfig;
use crate::location::error::{LocationError, SourceError};
use crate::location::state::TrainId;

/// Trait for fetching a train's live running status.
pub trait LiveStatusClient: Send + Sync + 'static {
    fn fetch_status(
        &self,
        train_id: &TrainId,
    ) -> impl Future<Output = Result<LiveStatus, SourceError>> + Send;
}

/// Placeholder client type for managers built without a live-status feed.
///
/// Uninhabited: no value of this type can exist.
#[derive(Debug)]
pub enum NoLiveStatus {}

impl LiveStatusClient for NoLiveStatus {
    async fn fetch_status(&self, _train_id: &TrainId) -> Result<LiveStatus, SourceError> {
        match *self {}
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LiveStatusRequest<'a> {
    train_no: &'a str,
    /// Journey date, `YYYY-MM-DD`.
    date: String,
}

/// Client for the IRCTC live train status API on RapidAPI.
pub struct RapidApiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    host: String,
}

impl std::fmt::Debug for RapidApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapidApiClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl RapidApiClient {
    /// Create a client from configuration.
    ///
    /// Fails with `Configuration` when no API key is configured.
    pub fn new(config: &LiveStatusConfig) -> Result<Self, LocationError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LocationError::Configuration("live status requires a RapidAPI key".to_string())
            })?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LocationError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/api/v1/liveTrainStatus",
                config.base_url.trim_end_matches('/')
            ),
            api_key,
            host: config.host.clone(),
        })
    }
}

impl LiveStatusClient for RapidApiClient {
    async fn fetch_status(&self, train_id: &TrainId) -> Result<LiveStatus, SourceError> {
        let request = LiveStatusRequest {
            train_no: train_id.as_str(),
            date: Utc::now().format("%Y-%m-%d").to_string(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host)
            .json(&request)
            .send()
            .await?;

        match response.status().as_u16() {
            429 => return Err(SourceError::QuotaExceeded),
            404 => return Err(SourceError::TrainNotFound(train_id.to_string())),
            code if !response.status().is_success() => return Err(SourceError::Status(code)),
            _ => {}
        }

        let body = response.bytes().await?;
        let status = parse_live_status(&body)?;

        tracing::debug!(
            train_id = %train_id,
            station = %status.current_station.name,
            delay_minutes = status.delay_minutes,
            status = ?status.status,
            "Live status fetched"
        );
        Ok(status)
    }
}
