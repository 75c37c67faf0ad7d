//! Transition rules of the watch state machine.
//!
//! Kept free of I/O so every edge can be tested directly.
//!
//! ```text
//! Idle ──watch──► Connecting ──first merged update──► WebSocketPrimary
//!                     │                                     │
//!                     └──────── socket error/close ─────────┤
//!                                                           ▼
//!                                                    PollingFallback
//!                                                           │ first request failure
//!                                                           ▼
//!                  Connecting ◄───── retry ────────── SimulationOnly
//! ```

use crate::location::state::{UpdateSource, WatchState};

/// Which network paths have failed in the current attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceFailures {
    pub websocket: bool,
    pub polling: bool,
}

impl SourceFailures {
    /// Both network paths have failed at least once.
    pub fn network_exhausted(&self) -> bool {
        self.websocket && self.polling
    }
}

/// State to enter after an update from `source` was merged.
pub fn after_update(state: WatchState, source: UpdateSource) -> Option<WatchState> {
    match (state, source) {
        (WatchState::Connecting, UpdateSource::WebSocket) => Some(WatchState::WebSocketPrimary),
        _ => None,
    }
}

/// State to enter after `source` failed.
///
/// Records the failure in `failures`. Failures from sources that are not
/// the active topology's are ignored.
pub fn after_failure(
    state: WatchState,
    source: UpdateSource,
    failures: &mut SourceFailures,
) -> Option<WatchState> {
    match (state, source) {
        (WatchState::Connecting | WatchState::WebSocketPrimary, UpdateSource::WebSocket) => {
            failures.websocket = true;
            Some(WatchState::PollingFallback)
        }
        (WatchState::PollingFallback, UpdateSource::Polling) => {
            failures.polling = true;
            failures
                .network_exhausted()
                .then_some(WatchState::SimulationOnly)
        }
        _ => None,
    }
}

/// State to enter on a manual retry.
pub fn after_retry(state: WatchState) -> Option<WatchState> {
    match state {
        WatchState::SimulationOnly => Some(WatchState::Connecting),
        _ => None,
    }
}
