//! Change event decoded from a notification payload.

use compact_str::CompactString;
use std::str::FromStr;
use tablecast_sdk::objects::{Operation, UnknownOperation, WebhookPayload};
use thiserror::Error;

/// A row-level change reported on the notification channel.
///
/// Built from an `"operation,table"` payload, e.g. `"UPDATE,orders"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub operation: Operation,
    pub table: CompactString,
}

/// Reasons a notification payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload has no comma separating operation and table")]
    MissingSeparator,

    #[error("payload has an empty operation field")]
    EmptyOperation,

    #[error("payload has an empty table field")]
    EmptyTable,

    #[error(transparent)]
    UnknownOperation(#[from] UnknownOperation),
}

impl ChangeEvent {
    /// Decode a notification payload.
    ///
    /// The payload is split on the first comma only, so `"INSERT,a,b"`
    /// yields the table `"a,b"`. Both fields are trimmed.
    pub fn parse(payload: &str) -> Result<Self, PayloadError> {
        let (operation, table) = payload
            .split_once(',')
            .ok_or(PayloadError::MissingSeparator)?;

        let operation = operation.trim();
        if operation.is_empty() {
            return Err(PayloadError::EmptyOperation);
        }
        let table = table.trim();
        if table.is_empty() {
            return Err(PayloadError::EmptyTable);
        }

        Ok(Self {
            operation: Operation::from_str(operation)?,
            table: CompactString::from(table),
        })
    }

    /// The body POSTed to the automation webhook.
    pub fn to_payload(&self) -> WebhookPayload {
        WebhookPayload {
            table: self.table.clone(),
            operation: self.operation,
        }
    }
}

impl FromStr for ChangeEvent {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.operation, self.table)
    }
}
