//! User profile rows (`users` table)
//!
//! Profiles are written at sign-up and never read back for authentication.
//! The only read is the existence check that makes a retried write
//! idempotent.

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, BackendResult, Filter, Query};

/// Table holding user profiles on the backend platform
pub const USERS_TABLE: &str = "users";

/// Profile fields stored alongside the platform account
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "<hash>"))
            .finish()
    }
}

/// Insert a profile row
pub async fn insert_profile(backend: &dyn Backend, profile: &Profile) -> BackendResult<()> {
    let row = serde_json::to_value(profile)?;
    backend.insert(USERS_TABLE, row).await?;
    Ok(())
}

/// Whether a profile row for this email already exists
pub async fn profile_exists(backend: &dyn Backend, email: &str) -> BackendResult<bool> {
    let query = Query::new().filter(Filter::eq("email", email));
    let rows = backend.select(USERS_TABLE, &query).await?;
    Ok(!rows.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    #[test]
    fn test_row_omits_missing_hash() {
        let profile = Profile {
            email: "a@example.com".to_string(),
            username: "alice".to_string(),
            password_hash: None,
        };
        let row = serde_json::to_value(&profile).unwrap();
        assert!(row.get("password_hash").is_none());
        assert!(!format!("{:?}", profile).contains("$2"));
    }

    #[tokio::test]
    async fn test_insert_then_exists() {
        let backend = InMemoryBackend::new();
        let profile = Profile {
            email: "a@example.com".to_string(),
            username: "alice".to_string(),
            password_hash: Some("$2b$04$abc".to_string()),
        };

        assert!(!profile_exists(&backend, "a@example.com").await.unwrap());
        insert_profile(&backend, &profile).await.unwrap();
        assert!(profile_exists(&backend, "a@example.com").await.unwrap());

        let rows = backend.rows(USERS_TABLE).await;
        assert_eq!(rows[0]["username"], "alice");
        assert_eq!(rows[0]["password_hash"], "$2b$04$abc");
    }
}
