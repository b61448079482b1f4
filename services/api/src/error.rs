//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its
//! mapping onto HTTP responses.
//!
//! Auth, validation, and credential failures carry their own message to the
//! client. Annotation and storage failures are logged with full detail
//! server-side and surface only as an opaque message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use linkstash_core::ports::{
    AnnotationError, AuthError, CredentialError, StorageError, ValidationError,
};
use serde::Serialize;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body sent with every error response.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Auth(e) => (StatusCode::UNAUTHORIZED, e.to_string()),

            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),

            ApiError::Credential(CredentialError::EmailTaken) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            ApiError::Credential(CredentialError::WeakPassword) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Credential(CredentialError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }

            ApiError::Annotation(e) => {
                error!("annotation failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to analyze or save the link.".to_string(),
                )
            }

            // A conflict reaching this point was not re-mapped by a handler
            // into its domain meaning; report it as a plain conflict.
            ApiError::Storage(StorageError::Conflict) => {
                (StatusCode::CONFLICT, "Record already exists.".to_string())
            }
            ApiError::Storage(e @ StorageError::ReadFailed(_)) => {
                error!("storage read failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to retrieve links.".to_string(),
                )
            }
            ApiError::Storage(e) => {
                error!("storage write failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to analyze or save the link.".to_string(),
                )
            }

            other => {
                error!("internal error: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred.".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
