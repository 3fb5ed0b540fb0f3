//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::SignUpError;
use crate::backend::BackendError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authorization code exchange failed; carries the platform's message
    #[error("{0}")]
    AuthCallback(String),

    /// Sign-up flow error
    #[error(transparent)]
    SignUp(#[from] SignUpError),

    /// Backend platform call failed
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub request_id: String,
    /// Account left without a profile; its id is the retry handle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountRef>,
}

/// Account identity echoed on a partial sign-up
#[derive(Debug, Serialize)]
pub struct AccountRef {
    pub id: String,
    pub email: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::AuthCallback(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_CALLBACK_FAILED"),
            ApiError::SignUp(e) => match e {
                SignUpError::MissingField(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                SignUpError::Account(_) => (StatusCode::BAD_REQUEST, "SIGNUP_FAILED"),
                SignUpError::ProfileNotSaved { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PROFILE_NOT_SAVED")
                }
                SignUpError::NoPendingProfile(_) => (StatusCode::NOT_FOUND, "NO_PENDING_PROFILE"),
                SignUpError::Profile(_) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
                SignUpError::Hash(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            ApiError::Backend(_) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }

    fn account(&self) -> Option<AccountRef> {
        match self {
            ApiError::SignUp(SignUpError::ProfileNotSaved { account, .. }) => Some(AccountRef {
                id: account.id.clone(),
                email: account.email.clone(),
            }),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            request_id,
            account: self.account(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Profile;
    use crate::backend::Account;

    #[test]
    fn test_status_mapping() {
        let missing = ApiError::from(SignUpError::MissingField("email"));
        assert_eq!(missing.status_and_code().0, StatusCode::BAD_REQUEST);

        let backend = ApiError::from(BackendError::Timeout);
        assert_eq!(backend.status_and_code(), (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"));

        let partial = ApiError::from(SignUpError::ProfileNotSaved {
            account: Account {
                id: "u1".to_string(),
                email: "a@example.com".to_string(),
                confirmation_sent_at: None,
            },
            profile: Profile {
                email: "a@example.com".to_string(),
                username: "alice".to_string(),
                password_hash: None,
            },
            source: BackendError::Api {
                status: 403,
                message: "permission denied".to_string(),
            },
        });
        assert_eq!(
            partial.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "PROFILE_NOT_SAVED")
        );
        assert_eq!(partial.to_string(), "permission denied");

        let unknown = ApiError::from(SignUpError::NoPendingProfile("u9".to_string()));
        assert_eq!(unknown.status_and_code(), (StatusCode::NOT_FOUND, "NO_PENDING_PROFILE"));
    }

    #[tokio::test]
    async fn test_profile_not_saved_body_carries_account() {
        let partial = ApiError::from(SignUpError::ProfileNotSaved {
            account: Account {
                id: "u1".to_string(),
                email: "a@example.com".to_string(),
                confirmation_sent_at: None,
            },
            profile: Profile {
                email: "a@example.com".to_string(),
                username: "alice".to_string(),
                password_hash: None,
            },
            source: BackendError::Timeout,
        });

        let response = partial.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "PROFILE_NOT_SAVED");
        assert_eq!(body["account"]["id"], "u1");
        assert_eq!(body["account"]["email"], "a@example.com");

        let response = ApiError::from(BackendError::Timeout).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.get("account").is_none());
    }

    #[test]
    fn test_auth_callback_message_is_verbatim() {
        let err = ApiError::AuthCallback("invalid flow state".to_string());
        assert_eq!(err.to_string(), "invalid flow state");
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
