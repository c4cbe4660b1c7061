#![forbid(unsafe_code)]

use crate::config::ConfigError;
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use qc_core::AccessError;
use qc_storage::{ChecklistError, StoreError, UploadError};
use serde_json::json;

/// Failure body shared by every route: `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// 500 carrying `<context>: <cause>`.
    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::internal(format!("{context}: {err}"))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Maps an engine failure; only storage failures use `context`.
    pub fn checklist(context: &str, err: ChecklistError) -> Self {
        match err {
            ChecklistError::Access(err) => err.into(),
            ChecklistError::MissingField(field) => Self::bad_request(field.to_string()),
            ChecklistError::NotFound => Self::not_found(err.to_string()),
            ChecklistError::Storage(err) => Self::storage(context, err),
        }
    }

    pub fn upload(context: &str, err: UploadError) -> Self {
        match err {
            UploadError::TooLarge { .. } => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            UploadError::NotFound => Self::not_found(err.to_string()),
            UploadError::Io(err) => Self::storage(context, err),
        }
    }

    pub fn json_body(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }

    pub fn multipart(err: MultipartError) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(status, "File too large");
        }
        Self::new(status, err.body_text())
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        let status = match err {
            AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessError::Forbidden { .. } => StatusCode::FORBIDDEN,
        };
        Self::new(status, err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("worker failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), error = %self.message, "request failed");
        } else {
            tracing::debug!(status = self.status.as_u16(), error = %self.message, "request rejected");
        }
        let body = Json(json!({"success": false, "error": self.message}));
        (self.status, body).into_response()
    }
}

/// Errors that stop the server before it starts listening.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("storage: {0}")]
    Store(#[from] StoreError),
    #[error("uploads: {0}")]
    Upload(#[from] UploadError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
