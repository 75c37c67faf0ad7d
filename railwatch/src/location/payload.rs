//! Wire shape of a location payload.
//!
//! The WebSocket `data` object and the REST location endpoint share this flat
//! JSON shape:
//!
//! ```text
//! { "lat": 26.4499, "lng": 80.3319, "chainage": "441.2", "speedKmph": 130,
//!   "status": "On Time", "nextStation": "Kanpur Central", "eta": "14:25",
//!   "timestamp": "2024-01-15T10:30:00Z" }
//! ```

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::state::{Coordinates, LocationUpdate, TrainStatus};

/// Flat location payload as sent by the tracking backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Chainage in kilometres. Some backends send a number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub chainage: Option<String>,
    pub speed_kmph: Option<f64>,
    pub status: Option<String>,
    pub next_station: Option<String>,
    pub eta: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

impl LocationPayload {
    /// Convert to a partial update.
    ///
    /// Coordinates are set only when both components are present. Unknown
    /// status strings are dropped so the previous status stays in place.
    pub fn into_update(self) -> LocationUpdate {
        let status = self.status.as_deref().and_then(|s| match s.parse::<TrainStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                tracing::debug!(status = s, "Ignoring unknown train status");
                None
            }
        });

        LocationUpdate {
            train_id: None,
            coordinates: self.lat.zip(self.lng).map(|(lat, lng)| Coordinates::new(lat, lng)),
            chainage_km: self.chainage,
            speed_kmph: self.speed_kmph,
            status,
            next_station: self.next_station,
            eta: self.eta,
            delay_minutes: None,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_payload() {
        let json = r#"{
            "lat": 26.4499, "lng": 80.3319, "chainage": "441.2", "speedKmph": 130,
            "status": "On Time", "nextStation": "Kanpur Central", "eta": "14:25",
            "timestamp": "2024-01-15T10:30:00Z"
        }"#;
        let update = serde_json::from_str::<LocationPayload>(json)
            .unwrap()
            .into_update();

        assert_eq!(update.coordinates, Some(Coordinates::new(26.4499, 80.3319)));
        assert_eq!(update.chainage_km.as_deref(), Some("441.2"));
        assert_eq!(update.speed_kmph, Some(130.0));
        assert_eq!(update.status, Some(TrainStatus::OnTime));
        assert_eq!(update.next_station.as_deref(), Some("Kanpur Central"));
        assert_eq!(update.eta.as_deref(), Some("14:25"));
    }

    #[test]
    fn test_numeric_chainage() {
        let payload: LocationPayload =
            serde_json::from_str(r#"{"lat": 1.0, "lng": 2.0, "chainage": 12.5}"#).unwrap();
        assert_eq!(payload.chainage.as_deref(), Some("12.5"));
    }

    #[test]
    fn test_half_coordinates_are_absent() {
        let update = serde_json::from_str::<LocationPayload>(r#"{"lat": 1.0}"#)
            .unwrap()
            .into_update();
        assert!(update.coordinates.is_none());
    }

    #[test]
    fn test_unknown_status_dropped() {
        let update = serde_json::from_str::<LocationPayload>(
            r#"{"lat": 1.0, "lng": 2.0, "status": "Levitating"}"#,
        )
        .unwrap()
        .into_update();
        assert!(update.status.is_none());
    }

    #[test]
    fn test_null_fields_are_absent() {
        let update = serde_json::from_str::<LocationPayload>(
            r#"{"lat": 1.0, "lng": 2.0, "chainage": null, "eta": null}"#,
        )
        .unwrap()
        .into_update();
        assert!(update.chainage_km.is_none());
        assert!(update.eta.is_none());
    }
}
