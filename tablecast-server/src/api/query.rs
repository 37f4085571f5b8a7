//! `GET /get-data` — query endpoint.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use super::ApiError;
use crate::state::AppState;

/// Returns the current snapshot as a JSON array, `[]` if nothing has been
/// ingested yet. Rows are returned unfiltered and in ingest order.
pub(super) async fn get_data(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.snapshot.read().await;
    tracing::debug!(rows = snapshot.len(), "Serving snapshot");

    // Serialize straight from the shared snapshot instead of cloning it into `Json`.
    let body = serde_json::to_vec(&*snapshot).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

#[cfg(test)]
mod tests {
    use crate::server::tests::{get, read_json, test_app};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_empty_snapshot_is_empty_array() {
        let (app, _state, _shutdown) = test_app();
        let resp = app.oneshot(get("/get-data")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["content-type"],
            "application/json"
        );
        assert_eq!(read_json(resp).await, json!([]));
    }

    #[tokio::test]
    async fn test_repeated_reads_are_identical() {
        let (app, state, _shutdown) = test_app();
        state
            .snapshot
            .replace(vec![json!({"b": true, "a": null}), json!({"b": false, "a": 1.5})])
            .await;

        let first = read_json(app.clone().oneshot(get("/get-data")).await.unwrap()).await;
        let second = read_json(app.oneshot(get("/get-data")).await.unwrap()).await;
        assert_eq!(first, second);
        assert_eq!(first, json!([{"b": true, "a": null}, {"b": false, "a": 1.5}]));
    }
}
