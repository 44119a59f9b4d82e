//! API error types and handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pe_core::db::DbError;
use pe_core::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};

/// API error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (validation error, invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized (missing or invalid authentication).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (authenticated but not allowed).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict (e.g., duplicate resource).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error with field-level details.
    #[error("Validation failed")]
    ValidationError(ValidationErrorDetails),

    /// A policy delete stopped part way; retrying is safe.
    #[error("Delete of policy '{policy_id}' failed at step {step}")]
    CascadeDelete { policy_id: String, step: String },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Details for field-level validation errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetails {
    /// Overall validation error message.
    pub message: String,
    /// Field-specific errors.
    pub fields: HashMap<String, Vec<FieldError>>,
}

/// A single field validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Error code (e.g., "length", "range").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::CascadeDelete { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::CascadeDelete { .. } => "CASCADE_DELETE_FAILED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, details) = match &self {
            ApiError::ValidationError(details) => (
                details.message.clone(),
                serde_json::to_value(&details.fields).ok(),
            ),
            // Raw storage errors stay in the operator log.
            ApiError::Internal(_) | ApiError::Database(_) => {
                error!(error = %self, "Request failed with internal error");
                ("An internal error occurred".to_string(), None)
            }
            _ => (self.to_string(), None),
        };

        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} with id {} not found", entity, id))
            }
            DbError::Constraint(msg) => {
                warn!(error = %msg, "Storage constraint violation");
                ApiError::Conflict("The request conflicts with existing data".to_string())
            }
            err => ApiError::Database(err.to_string()),
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Validation(msg) => ApiError::BadRequest(msg),
            PolicyError::DuplicateRole(role) => {
                ApiError::Conflict(format!("A policy for role '{}' already exists", role))
            }
            PolicyError::NotFound(id) => ApiError::NotFound(format!("Policy '{}' not found", id)),
            PolicyError::ConstraintNotFound {
                policy_id,
                constraint_id,
            } => ApiError::NotFound(format!(
                "Constraint {} not found on policy '{}'",
                constraint_id, policy_id
            )),
            PolicyError::CascadeDelete {
                policy_id,
                step,
                source,
            } => {
                error!(policy_id = %policy_id, step = %step, error = %source, "Cascade delete failed");
                ApiError::CascadeDelete {
                    policy_id,
                    step: step.to_string(),
                }
            }
            PolicyError::Storage(err) => err.into(),
        }
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ApiError::Internal(format!("Session error: {}", err))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: HashMap<String, Vec<FieldError>> = HashMap::new();

        for (field_name, field_errors) in err.field_errors() {
            let errors: Vec<FieldError> = field_errors
                .iter()
                .map(|e| {
                    let code = e.code.to_string();
                    let message = e.message.clone().map(|m| m.to_string()).unwrap_or_else(|| {
                        format!("Field '{}' failed validation: {}", field_name, code)
                    });
                    FieldError { code, message }
                })
                .collect();
            fields.insert(field_name.to_string(), errors);
        }

        let message = match fields.len() {
            1 => format!(
                "Validation failed for field '{}'",
                fields.keys().next().map(String::as_str).unwrap_or_default()
            ),
            n => format!("Validation failed for {} fields", n),
        };

        ApiError::ValidationError(ValidationErrorDetails { message, fields })
    }
}
