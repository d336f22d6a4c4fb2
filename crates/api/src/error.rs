//! Error responses.
//!
//! Handlers return [`ApiError`], which renders `{ "error": <code>, "message": <text> }`
//! with the status code of the underlying error. Ceiling violations also carry
//! `projected_total` and `ceiling`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pagu_core::CoreError;
use pagu_core::ceiling::CeilingError;
use pagu_shared::AppError;
use serde_json::{Value, json};
use tracing::{debug, error};

/// Any failure a handler can return.
#[derive(Debug)]
pub enum ApiError {
    /// Raised at the HTTP boundary (auth, malformed input).
    App(AppError),
    /// Raised by the budget engine.
    Core(CoreError),
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self::App(e)
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self::Core(e)
    }
}

impl ApiError {
    /// Shorthand for a 400 on malformed request input.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::App(AppError::Validation(message.into()))
    }

    /// HTTP status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        let code = match self {
            Self::App(e) => e.status_code(),
            Self::Core(e) => e.status_code(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// JSON body of the response.
    #[must_use]
    pub fn body(&self) -> Value {
        match self {
            Self::App(e) => e.to_body(),
            Self::Core(e) => {
                let mut body = json!({
                    "error": e.error_code(),
                    "message": e.to_string(),
                });
                if let CoreError::Ceiling(CeilingError::Exceeded { projected, ceiling }) = e {
                    body["projected_total"] = json!(projected.to_string());
                    body["ceiling"] = json!(ceiling.to_string());
                }
                body
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = ?self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
