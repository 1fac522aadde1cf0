//! Error handling for the API server
//!
//! Handlers return [`ApiResult`]; every failure becomes a JSON body of the
//! form `{"error": code, "message": text, "details"?: [...]}`.
//!
//! # Example
//!
//! ```
//! use taskdesk_api::error::{ApiError, ApiResult};
//! use axum::Json;
//! use serde_json::json;
//!
//! async fn handler(found: bool) -> ApiResult<Json<serde_json::Value>> {
//!     if !found {
//!         return Err(ApiError::NotFound("Not found.".to_string()));
//!     }
//!     Ok(Json(json!({ "ok": true })))
//! }
//! ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use taskdesk_shared::{
    auth::{
        authorization::{AuthzError, SoftDeleteDenial},
        jwt::JwtError,
        middleware::AuthError,
        password::PasswordError,
    },
    models::user::SoftDeleteError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or rejected credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with current state (400), e.g. duplicate email
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Field validation failed (400)
    #[error("Validation failed: {} errors", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Conflict(_) | ApiError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Field-level validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Logged here, never returned
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Not found.".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation()
                    && db_err.constraint().is_some_and(|c| c.contains("email"))
                {
                    return ApiError::Conflict("A user with that email already exists.".to_string());
                }

                if db_err.is_foreign_key_violation() {
                    return ApiError::BadRequest("Referenced record does not exist.".to_string());
                }

                if db_err.is_check_violation() {
                    return ApiError::BadRequest(format!(
                        "Constraint violation: {}",
                        db_err.constraint().unwrap_or("check")
                    ));
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound("Not found.".to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::DatabaseError(msg) => ApiError::InternalError(msg),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<SoftDeleteError> for ApiError {
    fn from(err: SoftDeleteError) -> Self {
        match err {
            SoftDeleteError::NotFound => ApiError::NotFound("User not found.".to_string()),
            SoftDeleteError::Denied(denial @ SoftDeleteDenial::NotAdmin) => {
                ApiError::Forbidden(denial.to_string())
            }
            SoftDeleteError::Denied(denial) => ApiError::Conflict(denial.to_string()),
            SoftDeleteError::Database(e) => e.into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token is expired".to_string()),
            JwtError::WrongTokenType { expected, .. } => {
                ApiError::Unauthorized(format!("Token has wrong type, expected {}", expected))
            }
            _ => ApiError::Unauthorized("Token is invalid".to_string()),
        }
    }
}
