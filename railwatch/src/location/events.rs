//! Events flowing from source adapters to the session driver.
//!
//! Every adapter owns an [`EventSink`] scoped to one watch session and one
//! source. The sink is the adapter's "still active" flag: once its
//! cancellation token fires, nothing more is delivered, so a request that
//! resolves after a train switch can never reach `merge()`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use super::error::SourceError;
use super::state::{LocationUpdate, UpdateSource};

/// Buffer size of the per-session event channel.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 32;

/// What an adapter observed.
#[derive(Debug)]
pub enum SourceEventKind {
    /// Socket handshake completed.
    Connected,
    /// Partial location update to merge.
    Update(LocationUpdate),
    /// The source failed and has stopped.
    Failed(SourceError),
}

/// Adapter event tagged with its origin.
#[derive(Debug)]
pub struct SourceEvent {
    /// Watch session (generation) the adapter belongs to.
    pub session: u64,
    pub source: UpdateSource,
    pub kind: SourceEventKind,
}

/// Emission handle given to each adapter.
#[derive(Clone)]
pub struct EventSink {
    session: u64,
    source: UpdateSource,
    tx: mpsc::Sender<SourceEvent>,
    cancel: CancellationToken,
    resources: Option<Arc<AtomicUsize>>,
}

impl EventSink {
    pub fn new(
        session: u64,
        source: UpdateSource,
        tx: mpsc::Sender<SourceEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            source,
            tx,
            cancel,
            resources: None,
        }
    }

    /// Count this adapter's socket or timer in `resources` while it runs.
    pub fn tracking(mut self, resources: Arc<AtomicUsize>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn source(&self) -> UpdateSource {
        self.source
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// False once the adapter has been cancelled or the driver is gone.
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.tx.is_closed()
    }

    /// Resolves when the adapter is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Deliver an event unless the adapter is no longer active.
    ///
    /// Returns false when the event was discarded.
    pub async fn emit(&self, kind: SourceEventKind) -> bool {
        if !self.is_active() {
            tracing::debug!(
                source = %self.source,
                session = self.session,
                "Adapter inactive, discarding event"
            );
            return false;
        }

        let event = SourceEvent {
            session: self.session,
            source: self.source,
            kind,
        };

        tokio::select! {
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    /// Guard that keeps the resource counter raised until dropped.
    pub(crate) fn hold_resource(&self) -> Option<ResourceGuard> {
        self.resources.as_ref().map(|counter| ResourceGuard::acquire(Arc::clone(counter)))
    }
}

/// Decrements the live resource counter on drop.
pub(crate) struct ResourceGuard {
    counter: Arc<AtomicUsize>,
}

impl ResourceGuard {
    fn acquire(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
