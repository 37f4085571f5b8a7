//! Event system for the relay pipeline.
//!
//! # Event Flow
//!
//! 1. PostgreSQL `NOTIFY` payload -> `ChangeListener` decodes a `ChangeEvent`
//! 2. `ChangeListener` emits `ChangeEvent` -> `WebhookForwarder`
//! 3. `WebhookForwarder` POSTs the event to the automation endpoint
//!
//! The automation endpoint is expected to eventually call the ingest
//! endpoint with a fresh result set, which replaces the snapshot and
//! signals the broadcast hub. Nothing ties the three steps together.

pub mod channels;
pub mod types;

pub use channels::{
    ChangeEventReceiver, ChangeEventSender, DEFAULT_CHANNEL_BUFFER, change_event_channel,
};

pub use types::{ChangeEvent, PayloadError};
