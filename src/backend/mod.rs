//! Backend Platform Client
//!
//! All persistence, authentication and change notification live on a hosted
//! backend-as-a-service platform. This module defines the small contract the
//! rest of the application consumes, plus two implementations of it.
//!
//! ## Architecture
//!
//! - **Backend**: async trait covering auth, table access and subscriptions
//! - **RestBackend**: HTTP + realtime websocket client for the hosted platform
//! - **InMemoryBackend**: in-process platform for local development and tests
//! - **Subscription**: cancellable change feed with guaranteed teardown
//!
//! The client is constructed once and injected as `Arc<dyn Backend>`.

mod error;
mod memory;
mod realtime;
mod rest;
mod subscription;
mod types;

pub use error::{BackendError, BackendResult};
pub use memory::{InMemoryBackend, Operation};
pub use rest::{RestBackend, RestConfig};
pub use subscription::Subscription;
pub use types::{
    compare_values, Account, ChangeEvent, Credentials, Filter, Order, Query, Row, Session, User,
};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{BackendConfig, BackendKind, RealtimeConfig};

/// Client contract for the backend platform
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for logs and health output
    fn name(&self) -> &str;

    /// Check that the platform is reachable
    async fn health_check(&self) -> BackendResult<()>;

    /// Exchange an authorization code received via redirect for a session
    async fn exchange_code_for_session(&self, code: &str) -> BackendResult<Session>;

    /// Look up the session behind an access token.
    ///
    /// An unknown or expired token is `Ok(None)`, not an error.
    async fn get_session(&self, access_token: &str) -> BackendResult<Option<Session>>;

    /// Create an account. The platform hashes and stores the password itself.
    async fn sign_up(&self, credentials: &Credentials) -> BackendResult<Account>;

    /// Insert a row and return the stored representation
    async fn insert(&self, table: &str, row: Row) -> BackendResult<Vec<Row>>;

    /// Select rows matching a query
    async fn select(&self, table: &str, query: &Query) -> BackendResult<Vec<Row>>;

    /// Delete every row matching all filters
    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<()>;

    /// Subscribe to INSERT and DELETE events on a table
    async fn subscribe(&self, table: &str) -> BackendResult<Subscription>;
}

/// Build the configured backend client
pub fn from_config(
    config: &BackendConfig,
    realtime: &RealtimeConfig,
) -> BackendResult<Arc<dyn Backend>> {
    match config.kind {
        BackendKind::Memory => {
            tracing::info!("Using in-memory backend platform");
            Ok(Arc::new(InMemoryBackend::new()))
        }
        BackendKind::Rest => {
            tracing::info!(url = %config.url, "Using hosted backend platform");
            let rest = RestBackend::new(RestConfig::from_config(config, realtime))?;
            Ok(Arc::new(rest))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_memory() {
        let config = BackendConfig {
            kind: BackendKind::Memory,
            ..Default::default()
        };
        let backend = from_config(&config, &RealtimeConfig::default()).unwrap();
        assert_eq!(backend.name(), "memory");
    }

    #[test]
    fn test_from_config_rest() {
        let config = BackendConfig {
            kind: BackendKind::Rest,
            url: "http://localhost:54321".to_string(),
            anon_key: "anon".to_string(),
            ..Default::default()
        };
        let backend = from_config(&config, &RealtimeConfig::default()).unwrap();
        assert_eq!(backend.name(), "rest");
    }
}
