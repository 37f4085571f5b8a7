//! Shared wire types for tablecast, plus an optional HTTP/WebSocket client.
//!
//! The `objects` module is always available and is what the server uses to
//! (de)serialize its HTTP and live-update traffic. The `client` module is
//! gated behind the `client` feature.

#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
