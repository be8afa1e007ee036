use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// ApiError
///
/// The single error type flowing out of every gate and handler. Each variant maps
/// to exactly one HTTP status, so callers can reason about outcomes without parsing
/// message strings. No variant is fatal: every error path ends in a rendered JSON
/// response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required field was missing/empty, or a unique name is already taken.
    /// Recovered locally by the client; re-submission is expected.
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist, or is not visible to the caller.
    /// Foreign-owned notes deliberately surface as NotFound rather than Forbidden,
    /// so existence is never leaked.
    #[error("not found")]
    NotFound,

    /// No session resolved to a signed-in user. The handler never ran.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The resolved user lacks the Admin role. The handler never ran.
    #[error("insufficient permission")]
    InsufficientPermission,

    /// Login failure. The message stays generic so it never reveals which of
    /// username/password was wrong.
    #[error("username or password are incorrect")]
    CredentialMismatch,

    /// Unexpected infrastructure failure. The detail is logged server-side and
    /// never leaked to the client.
    #[error("internal server error")]
    Internal,
}

/// ErrorBody
///
/// The JSON envelope returned for every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable error code.
    pub error: String,
    /// Human-readable message, safe to show to the end user.
    pub message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientPermission => StatusCode::FORBIDDEN,
            ApiError::CredentialMismatch => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::NotFound => "not_found",
            ApiError::AuthenticationRequired => "authentication_required",
            ApiError::InsufficientPermission => "insufficient_permission",
            ApiError::CredentialMismatch => "credential_mismatch",
            ApiError::Internal => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_error_kinds() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::AuthenticationRequired.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::InsufficientPermission.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::CredentialMismatch.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn credential_mismatch_message_is_generic() {
        // The login error must not reveal which field was wrong.
        let msg = ApiError::CredentialMismatch.to_string();
        assert_eq!(msg, "username or password are incorrect");
    }
}
