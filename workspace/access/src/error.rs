use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Error types for tenant scoping and group authorization
#[derive(Error, Debug)]
pub enum AccessError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A request field is missing, malformed or violates a uniqueness rule
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// The principal is not a member of the groups the mutation requires
    #[error("{field}: {message}")]
    Authorization { field: String, message: String },

    /// The record does not exist or is outside the principal's scope
    #[error("Not found.")]
    NotFound,
}

impl AccessError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AccessError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn authorization(field: impl Into<String>, message: impl Into<String>) -> Self {
        AccessError::Authorization {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Maps a unique constraint violation onto a validation error for `field`,
    /// passing every other database error through.
    pub fn from_unique_violation(err: DbErr, field: &str, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AccessError::validation(field, message),
            _ => AccessError::Database(err),
        }
    }
}

/// Type alias for Result with AccessError
pub type Result<T> = std::result::Result<T, AccessError>;
