//! Long-running processors of the relay.
//!
//! - `ChangeListener`: Subscribes to the notification channel, emits `ChangeEvent`
//! - `WebhookForwarder`: Receives `ChangeEvent`, delivers it to the automation webhook

pub mod change_listener;
pub mod webhook_forwarder;

pub use change_listener::{ChangeListener, Dispatch, dispatch_payload};
pub use webhook_forwarder::{DeliveryOutcome, ForwardError, WebhookForwarder};
