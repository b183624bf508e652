use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::agent::UnsupportedMode;

/// Request-level failures that are reported through the HTTP status.
///
/// Agent failures are not among them: those travel in-band, as an `error`
/// chat response or a terminal `error` stream event.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    UnsupportedMode(#[from] UnsupportedMode),

    #[error("세션을 찾을 수 없습니다.")]
    SessionNotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMode(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::UnsupportedMode(mode) => tracing::warn!(mode = %mode.0, "Rejected unsupported mode"),
            Self::SessionNotFound(id) => tracing::debug!(session_id = %id, "Session not found"),
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
