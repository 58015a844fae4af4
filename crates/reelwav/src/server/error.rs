//! API error handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reelwav_core::{ErrorKind, ReelWavError};
use serde_json::json;
use tracing::{error, warn};

/// Error returned by handlers; rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}: {}", self.status, self.message);
        } else {
            warn!("{}: {}", self.status, self.message);
        }
        let body = Json(json!({ "detail": self.message }));
        (self.status, body).into_response()
    }
}

impl From<ReelWavError> for ApiError {
    fn from(err: ReelWavError) -> Self {
        match err.kind() {
            ErrorKind::FetchFailed => ApiError::bad_request(err.to_string()),
            ErrorKind::NoAudioTrack => ApiError::unprocessable(err.to_string()),
            ErrorKind::TranscodeFailed | ErrorKind::Internal => ApiError::internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text())
    }
}
