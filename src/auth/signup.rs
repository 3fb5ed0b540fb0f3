//! Sign-up
//!
//! Creates the platform account, then writes the profile row. The two writes
//! are not transactional: when the account exists but the profile write
//! fails, the caller gets [`SignUpError::ProfileNotSaved`] and the profile is
//! parked under the new account id. Only a parked profile can be finished
//! through [`SignUpService::complete_profile`], which is safe to repeat.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use super::password::hash_password;
use super::profile::{insert_profile, profile_exists, Profile};
use crate::backend::{Account, Backend, BackendError, Credentials};
use crate::config::SignUpConfig;

/// Submitted sign-up form
#[derive(Clone, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful sign-up: account plus the profile that was stored
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: Account,
    pub profile: Profile,
}

/// Sign-up failures
#[derive(Error, Debug)]
pub enum SignUpError {
    /// A required form field was empty
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Local password hashing failed
    #[error("Failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// The platform refused to create the account
    #[error("{0}")]
    Account(#[source] BackendError),

    /// The account exists but its profile row was not written
    #[error("{source}")]
    ProfileNotSaved {
        account: Account,
        profile: Profile,
        source: BackendError,
    },

    /// No failed profile write is parked under this account id
    #[error("no pending profile for account {0}")]
    NoPendingProfile(String),

    /// Profile retry failed
    #[error("{0}")]
    Profile(#[source] BackendError),
}

/// Sign-up flow over an injected backend client
pub struct SignUpService {
    backend: Arc<dyn Backend>,
    settings: SignUpConfig,
    /// Profiles whose write failed after the account was created, by account id
    pending: Mutex<HashMap<String, Profile>>,
}

impl SignUpService {
    pub fn new(backend: Arc<dyn Backend>, settings: SignUpConfig) -> Self {
        Self {
            backend,
            settings,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Validate, create the account, then store the profile
    pub async fn submit(&self, request: &SignUpRequest) -> Result<Registration, SignUpError> {
        validate(request)?;
        let profile = self.build_profile(request)?;

        let credentials = Credentials::new(&request.email, &request.password);
        let account = self
            .backend
            .sign_up(&credentials)
            .await
            .map_err(SignUpError::Account)?;

        tracing::info!(account_id = %account.id, email = %account.email, "Account created");

        if let Err(source) = insert_profile(self.backend.as_ref(), &profile).await {
            tracing::error!(
                account_id = %account.id,
                email = %account.email,
                error = %source,
                "Account created but profile not saved"
            );
            self.pending
                .lock()
                .await
                .insert(account.id.clone(), profile.clone());
            return Err(SignUpError::ProfileNotSaved {
                account,
                profile,
                source,
            });
        }

        Ok(Registration { account, profile })
    }

    /// Write the parked profile of an account whose sign-up partially failed.
    ///
    /// Unknown account ids are refused without touching the backend. Returns
    /// `false` when the row already existed and nothing was written.
    pub async fn complete_profile(&self, account_id: &str) -> Result<bool, SignUpError> {
        let profile = self
            .pending
            .lock()
            .await
            .get(account_id)
            .cloned()
            .ok_or_else(|| SignUpError::NoPendingProfile(account_id.to_string()))?;

        self.retry_profile(&profile).await.map_err(SignUpError::Profile)
    }

    /// Insert the profile unless a row for its email already exists
    pub async fn retry_profile(&self, profile: &Profile) -> Result<bool, BackendError> {
        if profile_exists(self.backend.as_ref(), &profile.email).await? {
            tracing::debug!(email = %profile.email, "Profile already stored");
            return Ok(false);
        }

        insert_profile(self.backend.as_ref(), profile).await?;
        tracing::info!(email = %profile.email, "Profile stored on retry");
        Ok(true)
    }

    fn build_profile(&self, request: &SignUpRequest) -> Result<Profile, SignUpError> {
        let password_hash = if self.settings.store_password_hash {
            Some(hash_password(&request.password, self.settings.hash_cost)?)
        } else {
            None
        };

        Ok(Profile {
            email: request.email.clone(),
            username: request.username.clone(),
            password_hash,
        })
    }
}

/// Required-field check only, no format or strength rules
fn validate(request: &SignUpRequest) -> Result<(), SignUpError> {
    if request.email.is_empty() {
        return Err(SignUpError::MissingField("email"));
    }
    if request.username.is_empty() {
        return Err(SignUpError::MissingField("username"));
    }
    if request.password.is_empty() {
        return Err(SignUpError::MissingField("password"));
    }
    Ok(())
}
