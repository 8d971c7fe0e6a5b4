//! Structured API errors with machine-readable codes.

use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// JSON body sent with every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    // 400
    MissingParameter(&'static str),
    InvalidParameter { field: &'static str, reason: String },

    // 404
    NoteNotFound(String),
    TagNotFound(String),

    // 500
    LockPoisoned(&'static str),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "MISSING_PARAMETER",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::NoteNotFound(_) => "NOTE_NOT_FOUND",
            Self::TagNotFound(_) => "TAG_NOT_FOUND",
            Self::LockPoisoned(_) => "LOCK_POISONED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            Self::NoteNotFound(_) | Self::TagNotFound(_) => StatusCode::NOT_FOUND,
            Self::LockPoisoned(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::MissingParameter(name) => format!("Missing {name} parameter"),
            Self::InvalidParameter { field, reason } => {
                format!("Invalid value for parameter '{field}': {reason}")
            }
            Self::NoteNotFound(title) => format!("Note '{title}' not found"),
            Self::TagNotFound(tag) => format!("Tag '{tag}' not found"),
            Self::LockPoisoned(resource) => {
                format!("Lock poisoned on '{resource}': a request panicked while holding it")
            }
            Self::Internal(err) => format!("Internal error: {err:#}"),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.message(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            tracing::error!(error = %format!("{err:#}"), "request failed");
        }
        (self.status_code(), Json(self.to_response())).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses() {
        let missing = ApiError::MissingParameter("source or target");
        assert_eq!(missing.code(), "MISSING_PARAMETER");
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.message(), "Missing source or target parameter");

        let absent = ApiError::NoteNotFound("Soil".into());
        assert_eq!(absent.status_code(), StatusCode::NOT_FOUND);

        let internal = ApiError::from(anyhow::anyhow!("disk full"));
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.to_response().message, "Internal error: disk full");
    }
}
