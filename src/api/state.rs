//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::SignUpService;
use crate::backend::Backend;
use crate::config::Config;
use crate::memos::MemoStore;
use crate::websocket::{ConnectionHub, HubConfig};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Backend platform client, shared by every flow
    pub backend: Arc<dyn Backend>,
    /// Memo table access for the REST routes
    pub memos: MemoStore,
    /// Sign-up flow
    pub signup: Arc<SignUpService>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// WebSocket connection hub for live memo boards
    pub ws_hub: Arc<ConnectionHub>,
}

impl AppState {
    /// Wire handlers to an injected backend client
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> Self {
        Self {
            memos: MemoStore::new(Arc::clone(&backend)),
            signup: Arc::new(SignUpService::new(
                Arc::clone(&backend),
                config.signup.clone(),
            )),
            config: Arc::new(ApiConfig::from(config)),
            start_time: Instant::now(),
            ws_hub: Arc::new(ConnectionHub::new(HubConfig::from(&config.realtime))),
            backend,
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origins; empty means any
    pub cors_origins: Vec<String>,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Where the auth callback sends a signed-in browser
    pub landing_path: String,
    /// Where the session guard sends visitors without a session
    pub signup_path: String,
    /// Name of the cookie holding the access token
    pub session_cookie: String,
    /// Mark the session cookie `Secure`
    pub secure_cookie: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ApiConfig {
    fn from(config: &Config) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            cors_origins: config.server.cors_origins.clone(),
            request_timeout_secs: config.server.request_timeout_secs,
            landing_path: config.auth.landing_path.clone(),
            signup_path: config.auth.signup_path.clone(),
            session_cookie: config.auth.session_cookie.clone(),
            secure_cookie: config.auth.secure_cookie,
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
