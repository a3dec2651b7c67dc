//! Handler-layer error taxonomy.
//!
//! Clients only ever see two outcomes: "Resource not found" (404) and
//! "Request failed" (status and key per endpoint, see `ErrorStyle`). The
//! variants below keep the cause around long enough to log it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domain::CoreError;
use http_common::{Endpoint, ErrorStyle, REQUEST_FAILED, RESOURCE_NOT_FOUND};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    /// The addressed record does not exist.
    #[error("resource not found")]
    NotFound,

    /// Body or query string could not be decoded.
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    /// Log the cause and render the client-facing response for `endpoint`.
    pub fn respond(self, endpoint: Endpoint, style: ErrorStyle) -> Response {
        match self {
            ApiError::NotFound | ApiError::Core(CoreError::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(http_common::json_err(RESOURCE_NOT_FOUND)),
            )
                .into_response(),
            other => {
                other.log(endpoint);
                let (status, key) = style.request_failed(endpoint);
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
                (
                    status,
                    Json(http_common::json_err_with_key(key, REQUEST_FAILED)),
                )
                    .into_response()
            }
        }
    }

    fn log(&self, endpoint: Endpoint) {
        match self {
            ApiError::Core(CoreError::Repository(_)) => {
                error!(?endpoint, err = %self, "store failure");
            }
            _ => {
                warn!(?endpoint, err = %self, "rejected request");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_is_404_regardless_of_style() {
        let resp = ApiError::NotFound.respond(Endpoint::Delete, ErrorStyle::Legacy);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"Error": "Resource not found"})
        );
    }

    #[tokio::test]
    async fn store_failure_collapses_to_request_failed() {
        let err = ApiError::from(CoreError::Repository("disk on fire".into()));
        let resp = err.respond(Endpoint::Create, ErrorStyle::Normalized);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"Error": "Request failed"})
        );
    }

    #[tokio::test]
    async fn legacy_delete_failure_uses_lowercase_key() {
        let err = ApiError::from(CoreError::InvalidId("short".into()));
        let resp = err.respond(Endpoint::Delete, ErrorStyle::Legacy);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"error": "Request failed"})
        );
    }
}
