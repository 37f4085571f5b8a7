//! ChangeListener processor.
//!
//! The ChangeListener is responsible for:
//! - Holding one `LISTEN` subscription on the configured notification channel
//! - Decoding each notification payload into a `ChangeEvent`
//! - Handing events to the `WebhookForwarder` without waiting on it
//! - Re-establishing the subscription with exponential backoff when the
//!   connection drops or cannot be opened
//!
//! Malformed payloads are logged and dropped. The data store has already
//! committed the change, so nothing is retried.

use crate::config::ListenerConfig;
use crate::events::{ChangeEvent, ChangeEventSender};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What happened to a single notification payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Decoded and queued for the forwarder.
    Queued,
    /// Could not be decoded; dropped.
    Malformed,
    /// The forwarder queue is full; dropped.
    QueueFull,
    /// The forwarder is gone.
    Closed,
}

/// Decode `payload` and queue the resulting event without blocking.
pub fn dispatch_payload(payload: &str, event_tx: &ChangeEventSender) -> Dispatch {
    let event = match ChangeEvent::parse(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(payload, error = %e, "Dropping malformed notification");
            return Dispatch::Malformed;
        }
    };

    debug!(operation = %event.operation, table = %event.table, "Received change notification");

    match event_tx.try_send(event) {
        Ok(()) => Dispatch::Queued,
        Err(TrySendError::Full(event)) => {
            warn!(
                operation = %event.operation,
                table = %event.table,
                "Forwarder queue full, dropping change event"
            );
            Dispatch::QueueFull
        }
        Err(TrySendError::Closed(_)) => Dispatch::Closed,
    }
}

/// ChangeListener consumes notifications from the data store.
pub struct ChangeListener {
    pool: PgPool,
    config: ListenerConfig,
}

impl ChangeListener {
    /// Create a new ChangeListener.
    ///
    /// The pool may be lazily connected; the listener retries until the
    /// database is reachable.
    pub fn new(pool: PgPool, config: ListenerConfig) -> Self {
        Self { pool, config }
    }

    /// Run the ChangeListener until shutdown is signaled or the forwarder
    /// goes away.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>, event_tx: ChangeEventSender) {
        let channel = self.config.channel.as_str();
        info!(channel, "ChangeListener started");

        let mut attempt: u32 = 0;

        'subscribe: loop {
            let mut listener = match self.subscribe().await {
                Ok(listener) => {
                    info!(channel, "Subscribed to notification channel");
                    attempt = 0;
                    listener
                }
                Err(e) => {
                    error!(channel, error = %e, attempt, "Failed to subscribe to notification channel");
                    if !self.wait_backoff(&mut shutdown_rx, attempt).await {
                        break 'subscribe;
                    }
                    attempt = attempt.saturating_add(1);
                    continue 'subscribe;
                }
            };

            loop {
                tokio::select! {
                    biased;

                    // Check for shutdown
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("ChangeListener received shutdown signal");
                            break 'subscribe;
                        }
                    }

                    received = listener.recv() => match received {
                        Ok(notification) => {
                            if dispatch_payload(notification.payload(), &event_tx) == Dispatch::Closed {
                                info!("ChangeEvent channel closed");
                                break 'subscribe;
                            }
                        }
                        Err(e) => {
                            error!(channel, error = %e, "Notification subscription lost");
                            if !self.wait_backoff(&mut shutdown_rx, attempt).await {
                                break 'subscribe;
                            }
                            attempt = attempt.saturating_add(1);
                            continue 'subscribe;
                        }
                    }
                }
            }
        }

        info!("ChangeListener shutdown complete");
    }

    async fn subscribe(&self) -> Result<PgListener, sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(&self.config.channel).await?;
        Ok(listener)
    }

    /// Sleep before retry `attempt`. Returns `false` if shutdown was
    /// signaled meanwhile.
    async fn wait_backoff(&self, shutdown_rx: &mut watch::Receiver<bool>, attempt: u32) -> bool {
        let delay = self.config.backoff.jittered_delay(attempt);
        warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Retrying notification subscription"
        );

        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                !(changed.is_err() || *shutdown_rx.borrow())
            }
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::change_event_channel;
    use tablecast_sdk::objects::Operation;
    use tokio::sync::mpsc;

    #[test]
    fn test_dispatch_queues_decoded_event() {
        let (tx, mut rx) = change_event_channel();
        assert_eq!(dispatch_payload("UPDATE,orders", &tx), Dispatch::Queued);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.operation, Operation::Update);
        assert_eq!(event.table, "orders");
    }

    #[test]
    fn test_dispatch_drops_malformed_payload() {
        let (tx, mut rx) = change_event_channel();
        assert_eq!(dispatch_payload("UPDATE", &tx), Dispatch::Malformed);
        assert_eq!(dispatch_payload("", &tx), Dispatch::Malformed);
        assert_eq!(dispatch_payload("MERGE,orders", &tx), Dispatch::Malformed);
        assert!(rx.try_recv().is_err());

        // The listener keeps going after bad payloads.
        assert_eq!(dispatch_payload("INSERT,orders", &tx), Dispatch::Queued);
        assert_eq!(rx.try_recv().unwrap().operation, Operation::Insert);
    }

    #[test]
    fn test_dispatch_preserves_receive_order() {
        let (tx, mut rx) = change_event_channel();
        for payload in ["INSERT,a", "UPDATE,b", "DELETE,c"] {
            assert_eq!(dispatch_payload(payload, &tx), Dispatch::Queued);
        }
        let tables: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|event| event.table.to_string())
            .collect();
        assert_eq!(tables, ["a", "b", "c"]);
    }

    #[test]
    fn test_dispatch_never_waits_on_full_queue() {
        let (tx, _rx) = mpsc::channel(1);
        assert_eq!(dispatch_payload("INSERT,a", &tx), Dispatch::Queued);
        assert_eq!(dispatch_payload("INSERT,b", &tx), Dispatch::QueueFull);
    }

    #[test]
    fn test_dispatch_reports_closed_forwarder() {
        let (tx, rx) = change_event_channel();
        drop(rx);
        assert_eq!(dispatch_payload("INSERT,a", &tx), Dispatch::Closed);
    }
}
