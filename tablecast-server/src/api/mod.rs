//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `POST /receive-data` – change notification or full result-set replace
//! - `GET  /get-data`     – current snapshot
//! - `GET  /ws`           – live-update channel

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tablecast_sdk::objects::ErrorBody;

use crate::state::AppState;

mod extractors;
mod ingest;
mod live;
mod query;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/receive-data", post(ingest::receive_data))
        .route("/get-data", get(query::get_data))
        .route("/ws", get(live::live_updates))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The body is neither a change notification nor a full result set.
    UnrecognizedShape,
    /// The body is not JSON at all.
    InvalidJson(String),
    /// The body was refused before parsing: too large, or not declared as JSON.
    BodyRejected(StatusCode),
    /// Anything unexpected. The detail is logged, never returned.
    Internal(String),
}

/// Message returned for every rejected ingest body.
pub const BAD_FORMAT_MESSAGE: &str = "incorrect data format";

/// Message returned when the body exceeds the size limit.
pub const BODY_TOO_LARGE_MESSAGE: &str = "request body too large";

/// Message returned when the body is not declared as `application/json`.
pub const NOT_JSON_MESSAGE: &str = "expected a JSON request body";

/// Message returned for every internal fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "something went wrong";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::UnrecognizedShape => (StatusCode::BAD_REQUEST, BAD_FORMAT_MESSAGE),
            ApiError::InvalidJson(detail) => {
                tracing::warn!(%detail, "Rejecting request body that is not valid JSON");
                (StatusCode::BAD_REQUEST, BAD_FORMAT_MESSAGE)
            }
            ApiError::BodyRejected(status) => {
                let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    BODY_TOO_LARGE_MESSAGE
                } else {
                    NOT_JSON_MESSAGE
                };
                tracing::warn!(%status, "Rejecting request body");
                (status, message)
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "Internal error while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
            }
        };
        (
            status,
            Json(ErrorBody {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}
