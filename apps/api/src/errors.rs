use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::screening::session::{FailureKind, ScreeningError, UNPROCESSABLE_MESSAGE};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("A screening is already in progress")]
    SessionBusy,

    #[error("Screening session was superseded")]
    SessionSuperseded,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Unprocessable screening result")]
    UnprocessableResult,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ScreeningError> for AppError {
    fn from(err: ScreeningError) -> Self {
        match err {
            ScreeningError::Busy => AppError::SessionBusy,
            ScreeningError::Superseded(_) => AppError::SessionSuperseded,
            ScreeningError::Failed(failure) => match failure.kind {
                FailureKind::Configuration => AppError::Configuration(failure.message),
                FailureKind::Upload => AppError::Upload(failure.message),
                FailureKind::Invocation => AppError::Agent(failure.message),
                FailureKind::Normalization => AppError::UnprocessableResult,
                FailureKind::Interrupted => AppError::Agent(failure.message),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::SessionBusy => (
                StatusCode::CONFLICT,
                "SESSION_BUSY",
                "A screening is already in progress".to_string(),
            ),
            AppError::SessionSuperseded => (
                StatusCode::CONFLICT,
                "SESSION_SUPERSEDED",
                "This screening was cancelled by a newer request".to_string(),
            ),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::Upload(msg) => (StatusCode::BAD_GATEWAY, "UPLOAD_ERROR", msg.clone()),
            AppError::Agent(msg) => (StatusCode::BAD_GATEWAY, "AGENT_ERROR", msg.clone()),
            AppError::UnprocessableResult => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_RESULT",
                UNPROCESSABLE_MESSAGE.to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::session::SessionFailure;

    #[test]
    fn test_failure_kinds_map_to_distinct_errors() {
        let cases = [
            (FailureKind::Configuration, StatusCode::INTERNAL_SERVER_ERROR),
            (FailureKind::Upload, StatusCode::BAD_GATEWAY),
            (FailureKind::Invocation, StatusCode::BAD_GATEWAY),
            (FailureKind::Normalization, StatusCode::UNPROCESSABLE_ENTITY),
            (FailureKind::Interrupted, StatusCode::BAD_GATEWAY),
        ];
        for (kind, status) in cases {
            let err: AppError = ScreeningError::Failed(SessionFailure::new(kind, "boom")).into();
            assert_eq!(err.into_response().status(), status, "{kind:?}");
        }
    }

    #[test]
    fn test_busy_is_a_conflict() {
        let err: AppError = ScreeningError::Busy.into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_normalization_message_is_generic() {
        let err: AppError =
            ScreeningError::Failed(SessionFailure::new(FailureKind::Normalization, "raw: {...}"))
                .into();
        assert!(!err.to_string().contains("raw"));
    }
}
