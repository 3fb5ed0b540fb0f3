//! Backend error types
//!
//! Errors produced while talking to the hosted backend platform, whether
//! over HTTP, over the realtime websocket, or from the in-memory platform.

use thiserror::Error;

/// Errors that can occur when calling the backend platform
#[derive(Error, Debug)]
pub enum BackendError {
    /// Platform could not be reached
    #[error("Backend unavailable")]
    Unavailable,

    /// Request exceeded the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Platform answered with a non-success status.
    ///
    /// The message is the platform's own, surfaced verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Authentication flow rejected (bad code, bad credentials)
    #[error("{0}")]
    Auth(String),

    /// Realtime channel failure
    #[error("Realtime error: {0}")]
    Realtime(String),
}

impl BackendError {
    /// HTTP status reported by the platform, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_connect() {
            BackendError::Unavailable
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Request(err)
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

/// Result type alias for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
