//! Push feed message format.
//!
//! ```text
//! { "type": "location_update" | "status_update" | "error",
//!   "trainId": "12001",
//!   "data": { ...location payload... },
//!   "timestamp": "2024-01-15T10:30:00Z" }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::location::error::LocationError;
use crate::location::payload::LocationPayload;
use crate::location::state::{LocationUpdate, TrainId};

/// Message type carrying a location payload.
pub const LOCATION_UPDATE: &str = "location_update";

/// Message type the backend uses to report its own errors.
pub const ERROR_MESSAGE: &str = "error";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    train_id: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// A decoded feed frame.
#[derive(Debug, PartialEq)]
pub enum FeedFrame {
    /// A `location_update` converted to a partial update.
    Location(LocationUpdate),
    /// Any other message type, with its raw `data`.
    Other { kind: String, data: Option<Value> },
}

/// Decode one text frame.
///
/// Fails with `MalformedUpdate` on invalid JSON, or on a `location_update`
/// whose `data` is missing or has the wrong shape.
pub fn parse_frame(text: &str) -> Result<FeedFrame, LocationError> {
    let message: FeedMessage = serde_json::from_str(text)
        .map_err(|e| LocationError::MalformedUpdate(format!("invalid JSON: {}", e)))?;

    if message.kind != LOCATION_UPDATE {
        return Ok(FeedFrame::Other {
            kind: message.kind,
            data: message.data,
        });
    }

    let data = message.data.ok_or_else(|| {
        LocationError::MalformedUpdate("location_update without data".to_string())
    })?;
    let payload: LocationPayload = serde_json::from_value(data)
        .map_err(|e| LocationError::MalformedUpdate(format!("invalid location data: {}", e)))?;

    let mut update = payload.into_update();
    update.train_id = message.train_id.and_then(|id| TrainId::new(id).ok());
    Ok(FeedFrame::Location(update))
}
