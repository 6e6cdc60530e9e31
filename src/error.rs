use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::session::Phase;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot {operation} while the session is {phase}")]
    InvalidStateTransition { operation: &'static str, phase: Phase },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    ValidationErrors(#[from] validator::ValidationErrors),

    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Excel export error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
    pub fn invalid_state(operation: &'static str, phase: Phase) -> Self {
        Error::InvalidStateTransition { operation, phase }
    }

    /// Stable machine-readable kind, used as the `error` field of API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidStateTransition { .. } => "invalid_state_transition",
            Error::Validation(_) | Error::ValidationErrors(_) => "validation_error",
            Error::Collaborator(_) => "collaborator_failure",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound(_) => "not_found",
            Error::Json(_) => "bad_request",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let kind = self.kind();
        let (status, message) = match &self {
            Error::InvalidStateTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::ValidationErrors(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Collaborator(msg) => {
                tracing::error!("Collaborator failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Xlsx(err) => {
                tracing::error!("Export failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Export error: {}", err))
            }
            other => {
                tracing::error!("Internal error: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": kind, "message": message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
