//! WebhookForwarder processor.
//!
//! The WebhookForwarder is responsible for:
//! - Receiving `ChangeEvent` from the listener queue
//! - POSTing `{"tabla": ..., "operacion": ...}` to the configured automation URL
//! - Bounding every call with a timeout and bounding the number of calls in flight
//!
//! Delivery is best-effort and at-most-once: failures are logged and the
//! event is forgotten. There is no retry queue.

use crate::config::{DeliveryMode, WebhookConfig};
use crate::events::{ChangeEvent, ChangeEventReceiver};
use crate::utils::versioned_store::VersionedStore;
use kanau::processor::Processor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Errors that can occur during webhook delivery.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection, TLS or protocol failure
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint did not answer within the configured timeout
    #[error("webhook timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint answered with a non-2xx status
    #[error("webhook delivery failed with status {status}: {body}")]
    DeliveryFailed { status: u16, body: String },
}

/// Successful result of handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint answered with a 2xx status.
    Delivered { status: u16 },
    /// No webhook URL is configured.
    Skipped,
}

/// WebhookForwarder delivers change events to the automation endpoint.
#[derive(Clone)]
pub struct WebhookForwarder {
    config: VersionedStore<WebhookConfig>,
    http_client: reqwest::Client,
}

impl WebhookForwarder {
    /// Create a new WebhookForwarder.
    ///
    /// The config store is read on every delivery, so swapping the URL or
    /// timeout takes effect for the next event.
    pub fn new(config: VersionedStore<WebhookConfig>) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Run the WebhookForwarder.
    ///
    /// Takes events from `event_rx` in receive order. In
    /// [`DeliveryMode::Concurrent`] each event gets its own task and the
    /// endpoint may see them complete in any order; in
    /// [`DeliveryMode::Sequential`] they are delivered one after another.
    /// Either way the listener is never made to wait for an HTTP round trip.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>, mut event_rx: ChangeEventReceiver) {
        let (mode, max_in_flight) = {
            let config = self.config.load().await;
            (config.mode, config.max_in_flight.max(1))
        };
        info!(?mode, max_in_flight, "WebhookForwarder started");

        let permits = Arc::new(Semaphore::new(max_in_flight));
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                // Check for shutdown
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("WebhookForwarder received shutdown signal");
                        break;
                    }
                }

                // Receive ChangeEvent events
                received = event_rx.recv() => {
                    let Some(event) = received else {
                        info!("ChangeEvent channel closed");
                        break;
                    };
                    match mode {
                        DeliveryMode::Sequential => self.forward(event).await,
                        DeliveryMode::Concurrent => {
                            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                                break;
                            };
                            let forwarder = self.clone();
                            in_flight.spawn(async move {
                                forwarder.forward(event).await;
                                drop(permit);
                            });
                            // Reap finished deliveries so the set stays small.
                            while in_flight.try_join_next().is_some() {}
                        }
                    }
                }
            }
        }

        // Every delivery is bounded by its timeout, so this terminates.
        while in_flight.join_next().await.is_some() {}

        info!("WebhookForwarder shutdown complete");
    }

    /// Deliver one event and log the outcome.
    async fn forward(&self, event: ChangeEvent) {
        match self.deliver(&event).await {
            Ok(DeliveryOutcome::Delivered { status }) => {
                info!(
                    table = %event.table,
                    operation = %event.operation,
                    status,
                    "Change notification forwarded"
                );
            }
            Ok(DeliveryOutcome::Skipped) => {}
            Err(e) => {
                error!(
                    table = %event.table,
                    operation = %event.operation,
                    error = %e,
                    "Failed to forward change notification"
                );
            }
        }
    }

    /// Issue exactly one POST for `event`.
    pub async fn deliver(&self, event: &ChangeEvent) -> Result<DeliveryOutcome, ForwardError> {
        let config = self.config.load().await;
        let Some(url) = config.url.as_ref() else {
            warn!(
                table = %event.table,
                operation = %event.operation,
                "Webhook URL is not configured, skipping change notification"
            );
            return Ok(DeliveryOutcome::Skipped);
        };

        debug!(%url, event = %event, "Sending webhook");

        let response = self
            .http_client
            .post(url.clone())
            .timeout(config.timeout)
            .json(&event.to_payload())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ForwardError::Timeout(config.timeout)
                } else {
                    ForwardError::Request(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(DeliveryOutcome::Delivered {
                status: status.as_u16(),
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ForwardError::DeliveryFailed {
                status: status.as_u16(),
                body,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Processor trait implementation
// ---------------------------------------------------------------------------

impl Processor<ChangeEvent> for WebhookForwarder {
    type Output = DeliveryOutcome;
    type Error = ForwardError;

    async fn process(&self, event: ChangeEvent) -> Result<DeliveryOutcome, ForwardError> {
        self.deliver(&event).await
    }
}
