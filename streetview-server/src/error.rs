//! API error handling module
//!
//! Renders a mapped [`TransportStatus`] (or a malformed request) as an HTTP
//! response with a `{ "error", "code" }` JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use streetview_core::{TransportCode, TransportStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A status produced by the error mapper
    #[error("{}", .0.message)]
    Status(TransportStatus),

    /// Request could not be parsed (missing or non-numeric query parameters)
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status(status) => match status.code {
                TransportCode::Ok => StatusCode::OK,
                TransportCode::InvalidArgument => StatusCode::BAD_REQUEST,
                TransportCode::NotFound => StatusCode::NOT_FOUND,
                TransportCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Status(status) => status.code.as_str(),
            Self::BadRequest(_) => TransportCode::InvalidArgument.as_str(),
        }
    }
}

impl From<TransportStatus> for ApiError {
    fn from(status: TransportStatus) -> Self {
        Self::Status(status)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code = code, "Server error");
        } else {
            tracing::warn!(status = %status, code = code, error = %message, "Client error");
        }

        let body = serde_json::json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
