//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.

use serde::{Deserialize, Serialize};

use crate::memos::Memo;

// ============================================
// AUTH DTOs
// ============================================

/// Query string of the auth callback
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    /// Authorization code issued by the identity provider
    #[serde(default)]
    pub code: Option<String>,
}

/// Identity shown on the home page
#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub email: String,
    pub message: String,
}

/// Created account
#[derive(Debug, Serialize, Deserialize)]
pub struct SignUpResponse {
    pub user_id: String,
    pub email: String,
}

/// Retry of a profile write, keyed by the account id from the failed sign-up
#[derive(Debug, Deserialize)]
pub struct ProfileRetryRequest {
    #[serde(default)]
    pub account_id: String,
}

// ============================================
// MEMO DTOs
// ============================================

/// New memo
#[derive(Debug, Deserialize)]
pub struct CreateMemoRequest {
    #[serde(default)]
    pub content: String,
}

/// Memo list, newest first
#[derive(Debug, Serialize, Deserialize)]
pub struct MemoListResponse {
    pub memos: Vec<Memo>,
    pub count: usize,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    /// Backend platform name
    pub backend: String,
    /// "ok" or "error"
    pub backend_status: String,
    pub ws_connections: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
