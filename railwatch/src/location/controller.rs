//! Reconciliation controller - owns the authoritative location record.
//!
//! Every adapter event ends up in [`ReconciliationController::merge`], which
//! applies one deterministic rule regardless of source:
//!
//! - `coordinates` are mandatory and always overwritten
//! - every other field is overwritten only when present and non-empty,
//!   otherwise the previous value is kept (sticky fields)
//! - `last_update_source` and `last_update_timestamp` are always overwritten
//!
//! Snapshots are copy-on-write: each merge publishes a new `Arc<TrainLocation>`
//! and never touches a snapshot already handed out.
//!
//! # Usage
//!
//! ```ignore
//! let controller = ReconciliationController::new();
//! controller.seed("12001", LocationUpdate::at(28.6139, 77.2090))?;
//!
//! let id = controller.subscribe(|snapshot| {
//!     println!("{} at {}", snapshot.train_id, snapshot.coordinates);
//! });
//!
//! controller.merge(LocationUpdate::at(26.4499, 80.3319), UpdateSource::Polling)?;
//! controller.unsubscribe(id);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use super::error::LocationError;
use super::provider::{LocationBroadcaster, LocationProvider};
use super::state::{Coordinates, LocationUpdate, TrainId, TrainLocation, UpdateSource};

/// Capacity of the snapshot broadcast channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Callback invoked synchronously after every successful merge.
pub type Listener = Arc<dyn Fn(&Arc<TrainLocation>) + Send + Sync>;

/// Handle returned by [`ReconciliationController::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Owner of the single `TrainLocation` record for the watched train.
pub struct ReconciliationController {
    /// Latest published snapshot.
    current: RwLock<Option<Arc<TrainLocation>>>,

    /// Serializes seed/merge and the listener calls that follow them.
    write_lock: Mutex<()>,

    /// Registered listeners, in registration order.
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,

    next_listener_id: AtomicU64,

    /// Broadcast channel for async consumers.
    broadcast_tx: broadcast::Sender<Arc<TrainLocation>>,
}

impl ReconciliationController {
    /// Create a controller with no record.
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self::with_broadcast(broadcast_tx)
    }

    /// Create a controller publishing snapshots on the given channel.
    pub fn with_broadcast(broadcast_tx: broadcast::Sender<Arc<TrainLocation>>) -> Self {
        Self {
            current: RwLock::new(None),
            write_lock: Mutex::new(()),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            broadcast_tx,
        }
    }

    /// Create a new authoritative record, replacing any previous one.
    ///
    /// Fails with `InvalidTrain` when the identifier is empty or the initial
    /// location has no usable coordinates.
    pub fn seed(
        &self,
        train_id: impl AsRef<str>,
        initial: LocationUpdate,
    ) -> Result<Arc<TrainLocation>, LocationError> {
        let train_id = TrainId::new(train_id)?;
        let coordinates = match initial.coordinates {
            Some(c) if c.is_valid() => c,
            Some(c) => {
                return Err(LocationError::InvalidTrain(format!(
                    "initial location for train {} is out of range ({})",
                    train_id, c
                )))
            }
            None => {
                return Err(LocationError::InvalidTrain(format!(
                    "no initial location for train {}",
                    train_id
                )))
            }
        };

        let _serial = self.write_lock.lock();
        let record = new_record(train_id, coordinates, initial, None, Utc::now());
        let snapshot = Arc::new(record);
        *self.current.write() = Some(Arc::clone(&snapshot));

        tracing::info!(
            train_id = %snapshot.train_id,
            lat = snapshot.coordinates.lat,
            lng = snapshot.coordinates.lng,
            "Location record seeded"
        );

        self.notify(&snapshot);
        Ok(snapshot)
    }

    /// Merge a partial update from `source` into the authoritative record.
    ///
    /// Rejects updates without valid coordinates with `MalformedUpdate`; the
    /// previous snapshot stays authoritative. An update naming a different
    /// train replaces the record instead of merging into it.
    pub fn merge(
        &self,
        update: LocationUpdate,
        source: UpdateSource,
    ) -> Result<Arc<TrainLocation>, LocationError> {
        let _serial = self.write_lock.lock();

        let coordinates = match update.coordinates {
            Some(c) if c.is_valid() => c,
            other => {
                let reason = match other {
                    Some(c) => format!("coordinates out of range ({})", c),
                    None => "missing coordinates".to_string(),
                };
                tracing::warn!(
                    source = %source,
                    reason = %reason,
                    "Rejected location update, keeping previous snapshot"
                );
                return Err(LocationError::MalformedUpdate(reason));
            }
        };

        let previous = self.current.read().clone().ok_or_else(|| {
            LocationError::InvalidTrain("no train is being watched".to_string())
        })?;

        let now = Utc::now();
        let record = match update.train_id.clone() {
            Some(train_id) if train_id != previous.train_id => {
                tracing::info!(
                    previous = %previous.train_id,
                    train_id = %train_id,
                    source = %source,
                    "Update for a different train, replacing record"
                );
                new_record(train_id, coordinates, update, Some(source), now)
            }
            _ => merge_sticky(&previous, coordinates, update, source, now),
        };

        let snapshot = Arc::new(record);
        *self.current.write() = Some(Arc::clone(&snapshot));

        tracing::trace!(
            train_id = %snapshot.train_id,
            source = %source,
            lat = snapshot.coordinates.lat,
            lng = snapshot.coordinates.lng,
            chainage_km = ?snapshot.chainage_km,
            "Location merged"
        );

        self.notify(&snapshot);
        Ok(snapshot)
    }

    /// Latest snapshot, if a train is being watched.
    pub fn current_snapshot(&self) -> Option<Arc<TrainLocation>> {
        self.current.read().clone()
    }

    /// Release the record (watch stopped).
    pub fn clear(&self) {
        let _serial = self.write_lock.lock();
        if let Some(previous) = self.current.write().take() {
            tracing::debug!(train_id = %previous.train_id, "Location record released");
        }
    }

    /// Register a listener called synchronously after every seed and merge.
    ///
    /// Listeners must not call `seed` or `merge` themselves.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<TrainLocation>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Subscribe to snapshots as an async stream.
    pub fn updates(&self) -> broadcast::Receiver<Arc<TrainLocation>> {
        self.broadcast_tx.subscribe()
    }

    fn notify(&self, snapshot: &Arc<TrainLocation>) {
        // Snapshot the list so listeners may (un)subscribe while being called.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(snapshot);
        }

        // No receivers is fine.
        let _ = self.broadcast_tx.send(Arc::clone(snapshot));
    }
}

impl Default for ReconciliationController {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationProvider for ReconciliationController {
    fn snapshot(&self) -> Option<Arc<TrainLocation>> {
        self.current_snapshot()
    }
}

impl LocationBroadcaster for ReconciliationController {
    fn subscribe_updates(&self) -> broadcast::Receiver<Arc<TrainLocation>> {
        self.updates()
    }
}

/// Build a record from a single update, with no history to keep.
fn new_record(
    train_id: TrainId,
    coordinates: Coordinates,
    update: LocationUpdate,
    source: Option<UpdateSource>,
    at: DateTime<Utc>,
) -> TrainLocation {
    TrainLocation {
        train_id,
        coordinates,
        chainage_km: non_empty(update.chainage_km),
        speed_kmph: valid_speed(update.speed_kmph),
        status: update.status,
        next_station: non_empty(update.next_station),
        eta: non_empty(update.eta),
        delay_minutes: update.delay_minutes,
        last_update_source: source,
        last_update_timestamp: at,
    }
}

/// Apply the sticky-field rule on top of `previous`.
fn merge_sticky(
    previous: &TrainLocation,
    coordinates: Coordinates,
    update: LocationUpdate,
    source: UpdateSource,
    at: DateTime<Utc>,
) -> TrainLocation {
    TrainLocation {
        train_id: previous.train_id.clone(),
        coordinates,
        chainage_km: non_empty(update.chainage_km).or_else(|| previous.chainage_km.clone()),
        speed_kmph: valid_speed(update.speed_kmph).or(previous.speed_kmph),
        status: update.status.or(previous.status),
        next_station: non_empty(update.next_station).or_else(|| previous.next_station.clone()),
        eta: non_empty(update.eta).or_else(|| previous.eta.clone()),
        delay_minutes: update.delay_minutes.or(previous.delay_minutes),
        last_update_source: Some(source),
        last_update_timestamp: at,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn valid_speed(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}
