use std::collections::BTreeMap;

use access::AccessError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use thiserror::Error;
use validator::ValidationErrors;

use crate::schemas::ErrorResponse;

pub const VALIDATION_FAILED: &str = "Validation failed.";

/// Errors returned by request handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// One or more request fields were rejected
    #[error("Validation failed: {0:?}")]
    Validation(BTreeMap<String, Vec<String>>),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Authentication required.")]
    Unauthenticated,

    /// Absent and out-of-scope records are reported identically
    #[error("Not found.")]
    NotFound,

    #[error("Invalid page.")]
    InvalidPage,

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ApiError {
    /// A validation error for a single field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.into(), vec![message.into()]);
        ApiError::Validation(fields)
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "INVALID_BODY"),
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            ApiError::NotFound | ApiError::InvalidPage => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Database(db_err) => ApiError::Database(db_err),
            AccessError::Validation { field, message }
            | AccessError::Authorization { field, message } => ApiError::field(field, message),
            AccessError::NotFound => ApiError::NotFound,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid value ({}).", e.code),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        ApiError::Validation(fields)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (error, fields) = match self {
            ApiError::Validation(fields) => {
                tracing::warn!("Validation failed: {:?}", fields);
                (VALIDATION_FAILED.to_string(), Some(fields))
            }
            ApiError::Database(ref db_err) => {
                tracing::error!("Database error: {}", db_err);
                ("Internal server error".to_string(), None)
            }
            other => {
                tracing::debug!("Request rejected: {}", other);
                (other.to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error,
            code: code.to_string(),
            success: false,
            fields,
        });

        (status, body).into_response()
    }
}
