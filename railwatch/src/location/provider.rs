//! Provider traits for consumers of the reconciled location.
//!
//! Dashboard panels, the map and the export center depend on these traits
//! rather than on the controller itself:
//!
//! - [`LocationProvider`] - Query API (pull)
//! - [`LocationBroadcaster`] - Subscription API (push)

use std::sync::Arc;

use tokio::sync::broadcast;

use super::state::{Coordinates, TrainId, TrainLocation, UpdateSource};

/// Trait for querying the current location (pull API).
pub trait LocationProvider: Send + Sync {
    /// Latest immutable snapshot, if a train is being watched.
    fn snapshot(&self) -> Option<Arc<TrainLocation>>;

    /// Current coordinates (convenience method).
    fn coordinates(&self) -> Option<Coordinates> {
        self.snapshot().map(|s| s.coordinates)
    }

    /// Train the snapshot belongs to.
    fn train_id(&self) -> Option<TrainId> {
        self.snapshot().map(|s| s.train_id.clone())
    }

    /// Adapter that produced the latest merge.
    fn last_source(&self) -> Option<UpdateSource> {
        self.snapshot().and_then(|s| s.last_update_source)
    }

    /// Check if any location is known.
    fn has_location(&self) -> bool {
        self.snapshot().is_some()
    }
}

/// Trait for subscribing to snapshots (push API).
pub trait LocationBroadcaster: Send + Sync {
    /// Receive every snapshot published after this call.
    fn subscribe_updates(&self) -> broadcast::Receiver<Arc<TrainLocation>>;
}
