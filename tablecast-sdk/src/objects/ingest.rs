//! Bodies accepted and returned by `POST /receive-data` and `GET /get-data`.

use serde::{Deserialize, Serialize};

/// A single result row.
///
/// Rows are expected to be JSON objects mapping column name to a scalar, but
/// the relay treats them as opaque and hands them back exactly as received.
pub type Row = serde_json::Value;

/// Value of `tipoNotificacion` that marks a body as a change notification.
pub const CHANGE_NOTIFICATION_KIND: &str = "cambio";

/// Change-notification shape of the ingest body.
///
/// ```json
/// {"tipoNotificacion":"cambio","tabla":"orders","operacion":"UPDATE"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    #[serde(rename = "tipoNotificacion")]
    pub kind: String,
    #[serde(rename = "tabla")]
    pub table: String,
    #[serde(rename = "operacion")]
    pub operation: String,
}

impl ChangeNotification {
    pub fn new(table: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            kind: CHANGE_NOTIFICATION_KIND.to_string(),
            table: table.into(),
            operation: operation.into(),
        }
    }
}

/// Full result-set shape of the ingest body: `{"datos": [row, ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullResults {
    #[serde(rename = "datos")]
    pub rows: Vec<Row>,
}

/// Success acknowledgement returned by `POST /receive-data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestAck {
    pub message: String,
}

/// Structured error body used for every 4xx/5xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_notification_wire_names() {
        let value = serde_json::to_value(ChangeNotification::new("orders", "INSERT")).unwrap();
        assert_eq!(
            value,
            json!({"tipoNotificacion": "cambio", "tabla": "orders", "operacion": "INSERT"})
        );
    }

    #[test]
    fn test_full_results_keeps_row_order_and_columns() {
        let body = r#"{"datos":[{"name":"b","id":2},{"name":"a","id":1}]}"#;
        let parsed: FullResults = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(
            serde_json::to_string(&parsed.rows).unwrap(),
            r#"[{"name":"b","id":2},{"name":"a","id":1}]"#
        );
    }
}
