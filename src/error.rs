//! Centralized error handling module
//!
//! Provides unified error types for the collaborators. The device store itself
//! never fails; collaborator errors are surfaced through its `error` field.

use thiserror::Error;
use tracing::error;

/// Application-wide error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("New password and confirmation do not match")]
    PasswordMismatch,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn device_not_found() -> Self {
        AppError::NotFound("Device not found".to_string())
    }

    /// Stable classification code for display layers
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::PasswordMismatch => "PASSWORD_MISMATCH",
            AppError::Internal(msg) => {
                error!(error = %msg, "Internal error classified");
                "INTERNAL_ERROR"
            }
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;
