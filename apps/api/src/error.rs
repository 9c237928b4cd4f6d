//! Error types for the API.
//!
//! ```text
//! DbError::Rule(PermissionDenied)  → 403 {"detail": ...}
//! DbError::Rule(other)             → 400 {"<field>": ["msg", ...]}
//! DbError::NotFound                → 404 {"detail": ...}
//! unreadable JSON body             → 400 {"non_field_errors": [...]}
//! body without a JSON content type → 415 {"detail": ...}
//! everything else                  → 500 {"detail": ...}, logged
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mizhiwu_core::error::NON_FIELD_ERRORS;
use mizhiwu_core::{CoreError, FieldErrors, ValidationError};
use mizhiwu_db::DbError;
use serde_json::json;
use tracing::error;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("you do not have permission to perform this action")]
    PermissionDenied,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// 401 for a missing or unusable token.
    pub fn unauthenticated(detail: impl Into<String>) -> Self {
        ApiError::Unauthenticated(detail.into())
    }

    /// 400 for a body that is not JSON or does not fit the expected shape.
    pub fn malformed_body(detail: impl Into<String>) -> Self {
        ApiError::Validation(FieldErrors::single(NON_FIELD_ERRORS, detail))
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::PermissionDenied => ApiError::PermissionDenied,
            other => ApiError::Validation(other.into_field_errors()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        CoreError::from(error).into()
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<DbError> for ApiError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::Rule(rule) => rule.into(),
            DbError::NotFound { .. } => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::Internal(detail) => {
                error!(%detail, "Request failed");
                json!({ "detail": "internal server error" })
            }
            other => json!({ "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
