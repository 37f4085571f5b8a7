//! Custom Axum extractors.

use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use serde_json::Value;

use super::ApiError;

/// A JSON request body whose rejection is rendered as the API's structured
/// `{"error": ...}` body instead of Axum's plain-text default.
///
/// Oversized bodies keep their 413 and a missing JSON content type keeps its
/// 415; every other rejection is a 400.
///
/// The body is kept as an untyped [`Value`] so handlers can dispatch on its
/// shape themselves.
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                let status = rejection.status();
                if status == StatusCode::PAYLOAD_TOO_LARGE
                    || status == StatusCode::UNSUPPORTED_MEDIA_TYPE
                {
                    ApiError::BodyRejected(status)
                } else {
                    ApiError::InvalidJson(rejection.body_text())
                }
            })?;
        Ok(Self(value))
    }
}
