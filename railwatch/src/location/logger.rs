//! Periodic location logging daemon.
//!
//! Logs the reconciled snapshot and lifecycle state at a fixed interval,
//! useful for reviewing source switches after the fact.
//!
//! # Output Format
//!
//! Logs are emitted at DEBUG level with structured fields:
//! - `train_id` - Watched train
//! - `lat`, `lng` - Position in decimal degrees
//! - `chainage_km` - Track position marker, if known
//! - `speed_kmph` - Speed, if known
//! - `status` - Operational status, if known
//! - `source` - Adapter behind the latest merge
//! - `state` - Lifecycle state
//! - `age_secs` - Seconds since the latest merge

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::provider::LocationProvider;
use super::state::WatchStatus;

/// Default logging interval (30 seconds).
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Spawns a background task that periodically logs the current location.
///
/// Stops when the cancellation token is triggered. The caller should check
/// that DEBUG is enabled before spawning:
///
/// ```ignore
/// if tracing::enabled!(tracing::Level::DEBUG) {
///     spawn_location_logger(controller, lifecycle.subscribe_state(), cancel, DEFAULT_LOG_INTERVAL);
/// }
/// ```
pub fn spawn_location_logger<P>(
    provider: Arc<P>,
    status: watch::Receiver<WatchStatus>,
    cancellation: CancellationToken,
    interval: Duration,
) -> JoinHandle<()>
where
    P: LocationProvider + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    log_location(provider.as_ref(), &status.borrow());
                }
                _ = cancellation.cancelled() => {
                    tracing::debug!("Location logger stopped");
                    break;
                }
            }
        }
    })
}

fn log_location<P: LocationProvider + ?Sized>(provider: &P, status: &WatchStatus) {
    match provider.snapshot() {
        Some(snapshot) => {
            let age_secs = (Utc::now() - snapshot.last_update_timestamp).num_seconds();
            tracing::debug!(
                train_id = %snapshot.train_id,
                lat = format!("{:.5}", snapshot.coordinates.lat),
                lng = format!("{:.5}", snapshot.coordinates.lng),
                chainage_km = snapshot.chainage_km.as_deref().unwrap_or("-"),
                speed_kmph = ?snapshot.speed_kmph,
                status = ?snapshot.status,
                source = ?snapshot.last_update_source,
                state = %status.state,
                age_secs,
                "Train location"
            );
        }
        None => {
            tracing::debug!(state = %status.state, "Train location (no train watched)");
        }
    }
}
