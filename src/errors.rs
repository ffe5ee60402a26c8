use crate::services::error::FileManagerError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::fmt;

/// A lightweight wrapper for errors surfaced over HTTP.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Extra structured context, e.g. the keys behind a duplicate upload.
    pub details: Option<Value>,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "status": self.status.as_u16()
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<FileManagerError> for AppError {
    fn from(err: FileManagerError) -> Self {
        let status = match &err {
            FileManagerError::InvalidPath { .. } | FileManagerError::InvalidName { .. } => {
                StatusCode::BAD_REQUEST
            }
            FileManagerError::NotFound(_) => StatusCode::NOT_FOUND,
            FileManagerError::DirectoryNotEmpty(_) | FileManagerError::DuplicateContent { .. } => {
                StatusCode::CONFLICT
            }
            FileManagerError::StoreUnavailable(_) | FileManagerError::MetadataUnavailable(_) => {
                tracing::error!("backend failure: {}", err);
                StatusCode::SERVICE_UNAVAILABLE
            }
            FileManagerError::AuthRequired => StatusCode::UNAUTHORIZED,
        };
        let app_error = AppError::new(status, err.to_string());
        match err {
            FileManagerError::DuplicateContent { conflicts, .. } => {
                app_error.with_details(json!({ "conflicts": conflicts }))
            }
            _ => app_error,
        }
    }
}
