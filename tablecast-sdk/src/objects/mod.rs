//! Wire objects exchanged with the relay.
//!
//! Field names on the HTTP surface (`tipoNotificacion`, `tabla`,
//! `operacion`, `datos`) are fixed by the automation flows that already talk
//! to the relay, so the Rust names are mapped onto them with `serde(rename)`.

pub mod ingest;
pub mod webhook;
pub mod ws;

pub use ingest::{
    CHANGE_NOTIFICATION_KIND, ChangeNotification, ErrorBody, FullResults, IngestAck, Row,
};
pub use webhook::{Operation, UnknownOperation, WebhookPayload};
pub use ws::{LiveMessage, WsCloseCode};
