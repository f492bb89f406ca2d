//! Error → HTTP response mapping. Every failure renders as
//! `{"error": <message>, "code": <CODE>}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventide_scheduler::SchedulerError;
use eventide_users::UserError;
use serde_json::json;
use tracing::error;

use crate::validate::ValidationError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn internal(code: &'static str, err: &dyn std::error::Error) -> Self {
        error!(code, "request failed: {err}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, "internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"error": self.message, "code": self.code})),
        )
            .into_response()
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        let code = e.code();
        match e {
            SchedulerError::NotFound { .. } => ApiError::new(StatusCode::NOT_FOUND, code, e.to_string()),
            SchedulerError::InvalidArgument(msg) | SchedulerError::InvalidState(msg) => {
                ApiError::new(StatusCode::BAD_REQUEST, code, msg)
            }
            SchedulerError::Users(inner) => inner.into(),
            SchedulerError::Database(_) | SchedulerError::LockPoisoned => {
                ApiError::internal(code, &e)
            }
        }
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        let code = e.code();
        match e {
            UserError::NotFound(_) => ApiError::new(StatusCode::NOT_FOUND, code, e.to_string()),
            UserError::AlreadyExists(_) => ApiError::new(StatusCode::CONFLICT, code, e.to_string()),
            UserError::InvalidArgument(msg) => ApiError::new(StatusCode::BAD_REQUEST, code, msg),
            UserError::DatabaseError(_) | UserError::LockPoisoned => ApiError::internal(code, &e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.0)
    }
}

/// Malformed JSON, wrong field types and a missing content type are all 400.
impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "INVALID_BODY", e.body_text())
    }
}
