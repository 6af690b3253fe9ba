use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error envelope returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Machine-readable error class
    pub kind: ErrorKind,
    /// Human-readable, actionable description
    pub message: String,
    /// Whether repeating the same request may succeed
    pub retryable: bool,
    /// Offending input field for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// State the entity was in when a transition was rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    /// Transition or operation that was attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

/// Error classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Transport,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Transport => "transport",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A rejected state transition or uniqueness violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConflict {
    pub entity: String,
    pub current: Option<String>,
    pub attempted: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {message}")]
    ValidationError {
        field: Option<String>,
        message: String,
    },

    #[error("Conflict: {}", .0.message)]
    Conflict(StateConflict),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Request timed out")]
    Timeout,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|k| k.to_string());
        ServiceError::ValidationError {
            field,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    /// Translates a store error, turning constraint violations into conflicts.
    pub fn db_error(error: DbErr) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                ServiceError::Conflict(StateConflict {
                    entity: "record".to_string(),
                    current: None,
                    attempted: "insert".to_string(),
                    message: format!("Duplicate value violates a unique constraint ({})", detail),
                })
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                ServiceError::Conflict(StateConflict {
                    entity: "record".to_string(),
                    current: None,
                    attempted: "write".to_string(),
                    message: format!("Record is still referenced ({})", detail),
                })
            }
            _ => ServiceError::DatabaseError(error),
        }
    }

    /// Like [`ServiceError::db_error`] but names the entity and the duplicate
    /// on unique violations.
    pub fn db_error_for(entity: &str, attempted: &str, error: DbErr) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(StateConflict {
                entity: entity.to_string(),
                current: None,
                attempted: attempted.to_string(),
                message: format!("{} {} already exists", entity, attempted),
            }),
            _ => ServiceError::db_error(error),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::ValidationError {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::ValidationError {
            field: None,
            message: message.into(),
        }
    }

    pub fn conflict(
        entity: impl Into<String>,
        current: Option<String>,
        attempted: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ServiceError::Conflict(StateConflict {
            entity: entity.into(),
            current,
            attempted: attempted.into(),
            message: message.into(),
        })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError { .. } => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) | Self::ConcurrentModification(_) => ErrorKind::Conflict,
            Self::DatabaseError(_) | Self::Timeout => ErrorKind::Transport,
            Self::SerializationError(_) | Self::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Transient failures where repeating the request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DatabaseError(e) => is_transient(e),
            Self::Timeout | Self::ConcurrentModification(_) => true,
            _ => false,
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::DatabaseError(e) if is_transient(e) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError(_) | Self::SerializationError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(e) if is_transient(e) => {
                "Data store temporarily unavailable, please retry".to_string()
            }
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SerializationError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            Self::ConcurrentModification(id) => format!(
                "Record {} was modified by another operation; reload and retry",
                id
            ),
            Self::Conflict(c) => c.message.clone(),
            Self::ValidationError { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }
}

/// True when the store rejected a write because of a unique index.
pub fn is_unique_violation(error: &DbErr) -> bool {
    matches!(error.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Connection-level failures that are safe to retry for reads.
pub fn is_transient(error: &DbErr) -> bool {
    matches!(error, DbErr::ConnectionAcquire(_) | DbErr::Conn(_))
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (field, current_state, attempted) = match &self {
            Self::ValidationError { field, .. } => (field.clone(), None, None),
            Self::Conflict(c) => (None, c.current.clone(), Some(c.attempted.clone())),
            _ => (None, None, None),
        };

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            kind: self.kind(),
            message: self.response_message(),
            retryable: self.is_retryable(),
            field,
            current_state,
            attempted,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
