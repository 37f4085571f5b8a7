//! Configuration types for the relay processors.
//!
//! These are the validated runtime values; reading them from TOML, the CLI
//! and the environment is handled by the server crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::utils::backoff::Backoff;

/// Notification channel used when none is configured.
pub const DEFAULT_CHANNEL: &str = "evento_cambio";

/// Default bound on a single webhook round trip.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of webhook deliveries allowed in flight at once.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// Change listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Name of the PostgreSQL notification channel to `LISTEN` on.
    pub channel: String,
    /// Retry schedule for (re)establishing the subscription.
    pub backoff: Backoff,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            backoff: Backoff::default(),
        }
    }
}

/// How change events are handed to the automation endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// One task per event, bounded by `max_in_flight`. Completion order at
    /// the endpoint is not guaranteed.
    #[default]
    Concurrent,
    /// One delivery at a time, in the order events were received.
    Sequential,
}

/// Webhook forwarder configuration.
///
/// `url` and `timeout` are re-read for every delivery and may be swapped at
/// runtime; `mode` and `max_in_flight` are fixed when the forwarder starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Automation endpoint. `None` means every event is skipped.
    pub url: Option<Url>,
    pub timeout: Duration,
    pub mode: DeliveryMode,
    pub max_in_flight: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
            mode: DeliveryMode::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}
