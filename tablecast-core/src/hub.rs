//! Broadcast hub for live-update subscribers.
//!
//! Keeps a registry of connected subscribers and fans out a content-free
//! [`LiveMessage::DataChanged`] signal to each of them. Sending never waits:
//! a subscriber whose buffer is full or whose receiver is gone is removed
//! from the registry on the spot. New subscribers only see signals emitted
//! after they registered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tablecast_sdk::objects::LiveMessage;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};
use uuid::Uuid;

/// Identifier assigned to each live-update connection.
pub type SubscriberId = Uuid;

/// Signals buffered per subscriber before it is considered stuck.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

/// Registry of live-update subscribers.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<LiveMessage>>>,
    buffer: usize,
}

impl HubInner {
    fn registry(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<LiveMessage>>> {
        // No code path panics while holding the lock, but a poisoned
        // registry is still structurally valid.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register a new subscriber.
    ///
    /// The subscriber is removed again when the returned [`Subscription`]
    /// is dropped, or on the first failed send.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = Uuid::new_v4();
        let total = {
            let mut registry = self.inner.registry();
            registry.insert(id, tx);
            registry.len()
        };
        info!(subscriber = %id, total, "Live-update subscriber connected");
        Subscription {
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Send one `DataChanged` signal to every registered subscriber.
    pub fn broadcast(&self) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut registry = self.inner.registry();
        registry.retain(|id, tx| match tx.try_send(LiveMessage::DataChanged) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(subscriber = %id, "Subscriber buffer full, dropping subscriber");
                report.dropped += 1;
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = %id, "Subscriber gone, dropping from registry");
                report.dropped += 1;
                false
            }
        });
        report
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry().len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered live-update subscriber.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<LiveMessage>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next signal.
    ///
    /// Returns `None` once the hub has dropped this subscriber, either
    /// because a send failed or because the hub itself is gone.
    pub async fn recv(&mut self) -> Option<LiveMessage> {
        self.rx.recv().await
    }

    /// Take a pending signal without waiting.
    pub fn try_recv(&mut self) -> Option<LiveMessage> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            if hub.registry().remove(&self.id).is_some() {
                debug!(subscriber = %self.id, "Live-update subscriber disconnected");
            }
        }
    }
}
