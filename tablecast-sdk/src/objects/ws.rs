//! Live-update channel messages.
//!
//! The `GET /ws` endpoint upgrades to a WebSocket and pushes
//! [`LiveMessage`] JSON frames. The channel is server-to-client only.
//!
//! # Protocol
//!
//! 1. Nothing is sent on connect. A viewer that (re)connects should pull
//!    `GET /get-data` itself to resynchronize.
//! 2. Every time the snapshot is replaced the server sends one
//!    [`LiveMessage::DataChanged`] frame. The frame carries no rows.
//! 3. If the server cannot deliver a frame the connection is dropped; no
//!    error frame is sent.

use serde::{Deserialize, Serialize};

/// Server-to-client live-update message.
///
/// ```json
/// {"type":"data_changed"}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveMessage {
    /// The snapshot was replaced; re-pull `GET /get-data`.
    DataChanged,
}

/// WebSocket close codes used by the live-update channel.
pub struct WsCloseCode;

impl WsCloseCode {
    /// The server is shutting down.
    pub const GOING_AWAY: u16 = 1001;

    /// The subscriber fell behind and was dropped from the registry.
    pub const DROPPED: u16 = 4008;
}
