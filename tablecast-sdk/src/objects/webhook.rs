//! Payload forwarded to the automation webhook for each change event.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Row-level operation reported by the data store trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an operation tag is not one of INSERT, UPDATE or DELETE.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation: {0:?}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    /// Parse an operation tag, ignoring surrounding whitespace and case.
    ///
    /// The tag is normalized: `" insert"` parses to [`Operation::Insert`]
    /// and is written back out as `"INSERT"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.eq_ignore_ascii_case("INSERT") {
            Ok(Operation::Insert)
        } else if tag.eq_ignore_ascii_case("UPDATE") {
            Ok(Operation::Update)
        } else if tag.eq_ignore_ascii_case("DELETE") {
            Ok(Operation::Delete)
        } else {
            Err(UnknownOperation(tag.to_string()))
        }
    }
}

/// JSON body POSTed to the automation endpoint.
///
/// ```json
/// {"tabla":"orders","operacion":"UPDATE"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "tabla")]
    pub table: CompactString,
    #[serde(rename = "operacion")]
    pub operation: Operation,
}
