use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::db::StorageError;
use crate::types::MessageResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row exists but is deactivated. Reported exactly like `NotFound`.
    #[error("Inactive: {0}")]
    Inactive(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Bad request: {0}")]
    BadRequestWithHint(String, String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request_with_hint(msg: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::BadRequestWithHint(msg.into(), hint.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) | ApiError::Inactive(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::BadRequest(_) | ApiError::BadRequestWithHint(..) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Constraint(msg) => ApiError::Conflict(msg),
            other => {
                tracing::error!("Storage failure: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request_with_hint(
            rejection.body_text(),
            "Check required fields; algorithm must be \"ed25519\" and is_active \"true\" or \"false\"",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequestWithHint(msg, hint) => MessageResponse::error_with_hint(msg, hint),
            ApiError::NotFound(msg)
            | ApiError::Inactive(msg)
            | ApiError::Conflict(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Internal(msg) => MessageResponse::error(msg),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_and_inactive_share_status() {
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Inactive("x".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_is_client_error() {
        assert_eq!(ApiError::Conflict("dup".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_constraint_maps_to_conflict() {
        let err: ApiError = StorageError::Constraint("unique".into()).into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = StorageError::Database("disk".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
