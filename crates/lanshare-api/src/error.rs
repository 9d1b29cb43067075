//! HTTP error type. Every failing handler returns `{ "error": string }`
//! with a status that says where the failure came from.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use lanshare_core::wire::ErrorBody;

use crate::relay::RelayError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("File not found or not shared")]
    UnknownFile,
    #[error("File no longer available on server")]
    FileGone,
    #[error("Incorrect password")]
    Forbidden,
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::UnknownFile => StatusCode::NOT_FOUND,
            ApiError::FileGone => StatusCode::GONE,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Relay(e) => e.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
