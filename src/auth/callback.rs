//! Auth callback
//!
//! The identity provider redirects back with an authorization code. The code
//! is exchanged once for a session; there is no retry.

use crate::backend::{Backend, Session};

/// Result of handling a callback request
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// Exchange succeeded, send the browser to `location`
    Redirect { location: String, session: Session },
    /// Exchange failed with the platform's message
    Failed { message: String },
}

/// Exchange `code` for a session and decide where the browser goes
pub async fn complete_sign_in(
    backend: &dyn Backend,
    code: Option<&str>,
    landing_path: &str,
) -> CallbackOutcome {
    let Some(code) = code.filter(|c| !c.is_empty()) else {
        tracing::error!("Auth callback without authorization code");
        return CallbackOutcome::Failed {
            message: "Missing authorization code".to_string(),
        };
    };

    match backend.exchange_code_for_session(code).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "Signed in via auth callback");
            CallbackOutcome::Redirect {
                location: landing_path.to_string(),
                session,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Auth code exchange failed");
            CallbackOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryBackend, Operation};

    #[tokio::test]
    async fn test_valid_code_redirects() {
        let backend = InMemoryBackend::new();
        let code = backend.issue_code("a@example.com").await;

        match complete_sign_in(&backend, Some(&code), "/home").await {
            CallbackOutcome::Redirect { location, session } => {
                assert_eq!(location, "/home");
                assert_eq!(session.user.email, "a@example.com");
            }
            other => panic!("Expected redirect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backend_failure_carries_message() {
        let backend = InMemoryBackend::new();
        let code = backend.issue_code("a@example.com").await;
        backend.fail_next(Operation::ExchangeCode, "code verifier mismatch");

        let outcome = complete_sign_in(&backend, Some(&code), "/home").await;
        assert_eq!(
            outcome,
            CallbackOutcome::Failed {
                message: "code verifier mismatch".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_code_fails() {
        let backend = InMemoryBackend::new();
        let outcome = complete_sign_in(&backend, Some("bogus"), "/home").await;
        assert!(matches!(outcome, CallbackOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_missing_code_skips_backend() {
        let backend = InMemoryBackend::new();

        let outcome = complete_sign_in(&backend, None, "/home").await;
        assert!(matches!(outcome, CallbackOutcome::Failed { .. }));

        let outcome = complete_sign_in(&backend, Some(""), "/home").await;
        assert!(matches!(outcome, CallbackOutcome::Failed { .. }));

        assert_eq!(backend.request_count(), 0);
    }
}
