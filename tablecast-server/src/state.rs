//! Application state shared across all request handlers.

use tablecast_core::hub::BroadcastHub;
use tablecast_core::snapshot::SnapshotStore;
use tokio::sync::watch;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Current result set served by `GET /get-data`.
    pub snapshot: SnapshotStore,
    /// Live-update subscribers notified after every replace.
    pub hub: BroadcastHub,
    /// Flips to `true` when the server starts shutting down, so live
    /// connections can close themselves.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Create a new AppState with an empty snapshot and no subscribers.
    pub fn new(shutdown: watch::Receiver<bool>) -> Self {
        Self {
            snapshot: SnapshotStore::new(),
            hub: BroadcastHub::new(),
            shutdown,
        }
    }
}
