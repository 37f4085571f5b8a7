//! `POST /receive-data` — ingest endpoint.
//!
//! Accepts exactly two shapes, checked in this order:
//!
//! 1. A change notification `{"tipoNotificacion":"cambio","tabla":..,"operacion":..}`.
//!    Acknowledged and logged; the snapshot is left alone.
//! 2. A full result set `{"datos":[row, ...]}`. Replaces the snapshot, then
//!    signals every live-update subscriber.
//!
//! Anything else is rejected with 400 before any state is touched.

use axum::{Json, extract::State};
use serde_json::{Map, Value};
use tablecast_sdk::objects::{CHANGE_NOTIFICATION_KIND, IngestAck, Row};

use super::ApiError;
use super::extractors::JsonBody;
use crate::state::AppState;

/// Shape of an ingest body.
#[derive(Debug, PartialEq)]
enum Ingest {
    Change { table: String, operation: String },
    Results(Vec<Row>),
    Unrecognized,
}

fn non_empty_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn classify(body: Value) -> Ingest {
    let Value::Object(mut fields) = body else {
        return Ingest::Unrecognized;
    };

    if fields.get("tipoNotificacion").and_then(Value::as_str) == Some(CHANGE_NOTIFICATION_KIND) {
        if let (Some(table), Some(operation)) = (
            non_empty_str(&fields, "tabla"),
            non_empty_str(&fields, "operacion"),
        ) {
            return Ingest::Change {
                table: table.to_string(),
                operation: operation.to_string(),
            };
        }
    }

    match fields.remove("datos") {
        Some(Value::Array(rows)) => Ingest::Results(rows),
        _ => Ingest::Unrecognized,
    }
}

fn ack(message: &str) -> Json<IngestAck> {
    Json(IngestAck {
        message: message.to_string(),
    })
}

pub(super) async fn receive_data(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<IngestAck>, ApiError> {
    match classify(body) {
        Ingest::Change { table, operation } => {
            tracing::info!(%table, %operation, "Change notification received");
            Ok(ack("change notification received"))
        }
        Ingest::Results(rows) => {
            let row_count = rows.len();
            let version = state.snapshot.replace(rows).await;
            let report = state.hub.broadcast();
            tracing::info!(
                rows = row_count,
                version,
                delivered = report.delivered,
                dropped = report.dropped,
                "Snapshot replaced and subscribers signaled"
            );
            Ok(ack("data received and stored"))
        }
        Ingest::Unrecognized => {
            tracing::warn!("Rejecting ingest body with unrecognized shape");
            Err(ApiError::UnrecognizedShape)
        }
    }
}
