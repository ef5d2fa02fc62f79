//! Error types for explorer-api
//!
//! Every handler returns [`ApiResult`]; errors render as
//! `{"error": {"code": "...", "message": "..."}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::import::ImportError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Caller lacks the required role (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Upload exceeds the configured size limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// CSV import failure
    #[error(transparent)]
    Import(#[from] ImportError),

    /// explorer-common error
    #[error("Common error: {0}")]
    Common(#[from] explorer_common::Error),
}

fn is_constraint_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut missing = None;

        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            ApiError::Import(err) => {
                let (status, code) = match &err {
                    ImportError::MissingColumn(_) => (StatusCode::BAD_REQUEST, "MISSING_COLUMN"),
                    ImportError::MissingRequiredCell { .. } => {
                        (StatusCode::BAD_REQUEST, "MISSING_DATA")
                    }
                    ImportError::InvalidCell { .. } => (StatusCode::BAD_REQUEST, "INVALID_VALUE"),
                    ImportError::Csv(_) => (StatusCode::BAD_REQUEST, "INVALID_CSV"),
                    ImportError::UnsupportedType(_) => {
                        (StatusCode::BAD_REQUEST, "UNSUPPORTED_TYPE")
                    }
                    ImportError::UnresolvedReference(refs) => {
                        missing = serde_json::to_value(refs).ok();
                        (StatusCode::CONFLICT, "MANUAL_CREATION_REQUIRED")
                    }
                    ImportError::Persistence(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR")
                    }
                    ImportError::InternalInconsistency(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_INCONSISTENCY")
                    }
                };
                (status, code, err.to_string())
            }
            ApiError::Common(err) => {
                let (status, code) = match &err {
                    explorer_common::Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    explorer_common::Error::InvalidInput(_) => {
                        (StatusCode::BAD_REQUEST, "BAD_REQUEST")
                    }
                    explorer_common::Error::Database(db) if is_constraint_violation(db) => {
                        (StatusCode::CONFLICT, "CONSTRAINT_VIOLATION")
                    }
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
                };
                (status, code, err.to_string())
            }
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(missing) = missing {
            error["missing"] = missing;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
