//! Session guard
//!
//! Checks the current session once. No polling and no refresh: a session
//! that expires after the check is not re-validated.

use axum::http::{header, HeaderMap};

use crate::backend::{Backend, Session, User};

/// What the guarded page should do
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    /// Show the page for this user
    Authenticated(User),
    /// No session: send the visitor to sign-up
    SignUpRequired,
}

/// Resolve the session behind `access_token`.
///
/// A missing token, an unknown token and a failed lookup all mean "no
/// session"; the failure is only logged.
pub async fn check_session(backend: &dyn Backend, access_token: Option<&str>) -> GuardDecision {
    let Some(token) = access_token.filter(|t| !t.is_empty()) else {
        return GuardDecision::SignUpRequired;
    };

    match backend.get_session(token).await {
        Ok(Some(session)) => GuardDecision::Authenticated(session.user),
        Ok(None) => GuardDecision::SignUpRequired,
        Err(e) => {
            tracing::warn!(error = %e, "Session lookup failed");
            GuardDecision::SignUpRequired
        }
    }
}

/// Access token from the session cookie, falling back to a bearer header
pub fn access_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    cookie_value(headers, cookie_name).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
    })
}

/// `Set-Cookie` value carrying the session's access token.
///
/// `Max-Age` follows the session expiry, clamped at zero. Without an expiry
/// the cookie lives for the browser session.
pub fn session_cookie(cookie_name: &str, session: &Session, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        cookie_name, session.access_token
    );
    if let Some(expires_at) = session.expires_at {
        let max_age = (expires_at - chrono::Utc::now().timestamp()).max(0);
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryBackend, Operation};
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_session_present_shows_email() {
        let backend = InMemoryBackend::new();
        let session = backend.create_session("a@example.com").await;

        let decision = check_session(&backend, Some(&session.access_token)).await;
        match decision {
            GuardDecision::Authenticated(user) => assert_eq!(user.email, "a@example.com"),
            other => panic!("Expected Authenticated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_session_requires_sign_up() {
        let backend = InMemoryBackend::new();

        assert_eq!(check_session(&backend, None).await, GuardDecision::SignUpRequired);
        assert_eq!(
            check_session(&backend, Some("stale")).await,
            GuardDecision::SignUpRequired
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_requires_sign_up() {
        let backend = InMemoryBackend::new();
        let session = backend.create_session("a@example.com").await;
        backend.fail_next(Operation::GetSession, "auth service down");

        assert_eq!(
            check_session(&backend, Some(&session.access_token)).await,
            GuardDecision::SignUpRequired
        );
    }

    #[test]
    fn test_access_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; memopad-access-token=tok123; other=1"),
        );
        assert_eq!(
            access_token(&headers, "memopad-access-token"),
            Some("tok123".to_string())
        );
    }

    #[test]
    fn test_access_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok456"));
        assert_eq!(
            access_token(&headers, "memopad-access-token"),
            Some("tok456".to_string())
        );
        assert_eq!(access_token(&HeaderMap::new(), "memopad-access-token"), None);
    }

    fn session(expires_at: Option<i64>) -> Session {
        Session {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at,
            user: User {
                id: "u1".to_string(),
                email: "a@example.com".to_string(),
            },
        }
    }

    #[test]
    fn test_session_cookie_format() {
        let cookie = session_cookie("memopad-access-token", &session(None), false);
        assert_eq!(cookie, "memopad-access-token=tok; Path=/; HttpOnly; SameSite=Lax");
    }

    #[test]
    fn test_session_cookie_secure_and_max_age() {
        let expires_at = chrono::Utc::now().timestamp() + 3600;
        let cookie = session_cookie("memopad-access-token", &session(Some(expires_at)), true);
        assert!(cookie.ends_with("; Secure"));

        let max_age: i64 = cookie
            .split("; ")
            .find_map(|part| part.strip_prefix("Max-Age="))
            .unwrap()
            .parse()
            .unwrap();
        assert!((3590..=3600).contains(&max_age));

        let expired = session_cookie("memopad-access-token", &session(Some(0)), true);
        assert!(expired.contains("; Max-Age=0"));
    }
}
