//! Unified error taxonomy for the data-access core.
//!
//! Store errors are classified exactly once, when they cross the
//! repository boundary, and are passed through unchanged afterwards.
//! Cache errors never reach this type.

use domain::DomainError;
use thiserror::Error;

/// Application error kinds.
#[derive(Error, Debug)]
pub enum AppError {
    /// Lookup key absent (or soft-deleted)
    #[error("Resource not found")]
    NotFound,

    /// Unique constraint violation on a natural key
    #[error("{0} already exists")]
    Conflict(String),

    /// Malformed value or filter, rejected before the store
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stock adjustment would drive the quantity below zero
    #[error("Insufficient stock")]
    InsufficientStock,

    /// Store transport failure, lock timeout, deadlock, serialization failure
    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Stable error code for the transport layer
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::InsufficientStock => "INSUFFICIENT_STOCK",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Transient failures a caller may retry (at most once per call)
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Internal(_))
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Conflict(msg) => {
                if msg.ends_with("already exists") {
                    msg.clone()
                } else {
                    format!("{} already exists", msg)
                }
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// Store Error Classification
// =============================================================================

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        use sea_orm::{DbErr, SqlErr};

        if let DbErr::RecordNotFound(_) = err {
            return AppError::NotFound;
        }

        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                tracing::debug!(detail = %detail, "Unique constraint violated");
                AppError::Conflict("Resource".to_string())
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                tracing::debug!(detail = %detail, "Foreign key constraint violated");
                AppError::InvalidInput("Referenced resource does not exist".to_string())
            }
            _ => {
                tracing::error!("Database error: {:?}", err);
                AppError::Internal(format!("Database error: {}", err))
            }
        }
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::InvalidInput(msg),
            DomainError::Password(msg) => AppError::InvalidInput(msg),
            DomainError::NotFound(_) => AppError::NotFound,
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::InsufficientStock => AppError::InsufficientStock,
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Name the natural key behind a classified unique violation.
    pub fn label_conflict(self, what: &str) -> Self {
        match self {
            AppError::Conflict(_) => AppError::Conflict(what.to_string()),
            other => other,
        }
    }
}
