use std::collections::HashMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{lifecycle::LifecycleError, password::PasswordError, repository::RepositoryError};

/// ErrorCode
///
/// Machine-readable error codes carried in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    InvalidOperation,
    ValidationError,
    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict | ErrorCode::InvalidOperation => StatusCode::CONFLICT,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// AppError
///
/// The single error type returned by services, extractors and handlers.
/// Every variant maps onto one client-facing status; none of them is retried.
#[derive(Debug, Error)]
pub enum AppError {
    /// A user, post or role does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate username or email.
    #[error("{0}")]
    Conflict(String),

    /// A post transition attempted from a state that does not allow it.
    #[error("{0}")]
    InvalidOperation(String),

    /// The actor is authenticated but lacks permission.
    #[error("{0}")]
    Forbidden(String),

    /// Bad credentials, or a missing/invalid bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// The request body could not be parsed.
    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::InvalidOperation(_) => ErrorCode::InvalidOperation,
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::BadRequest(_) => ErrorCode::BadRequest,
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::Database(_) | AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.code().status_code()
    }
}

/// ErrorBody
///
/// Wire shape: `{"error": {"code": ..., "message": ..., "details": ...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    /// Field-level messages, only present for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

fn validation_details(errors: &validator::ValidationErrors) -> HashMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, field_errors)| {
            let messages = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();

        let (message, details) = match &self {
            AppError::Validation(errors) => {
                ("Validation failed".to_string(), Some(validation_details(errors)))
            }
            AppError::Database(_) | AppError::Internal(_) => {
                // Internal causes are logged, never returned to the client.
                tracing::error!(error = %self, "request failed with internal error");
                ("An internal error occurred".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        };
        (code.status_code(), Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate { field } => {
                AppError::Conflict(format!("{} already exists", capitalize(field)))
            }
            RepositoryError::MissingRole(role) => {
                AppError::NotFound(format!("Role not found with name: {}", role))
            }
            RepositoryError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotPermitted { .. } => AppError::Forbidden(err.to_string()),
            LifecycleError::IllegalTransition { .. } => AppError::InvalidOperation(err.to_string()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Mismatch => AppError::Unauthorized("Invalid username or password".into()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Internal(format!("token signing failed: {}", err))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
