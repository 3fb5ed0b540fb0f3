//! Hosted Platform REST Client
//!
//! HTTP client for the hosted backend platform's auth (`/auth/v1`) and
//! table (`/rest/v1`) APIs. Change subscriptions go through the realtime
//! websocket in [`super::realtime`].

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::error::{BackendError, BackendResult};
use super::realtime;
use super::subscription::Subscription;
use super::types::{Account, Credentials, Filter, Query, Row, Session, User};
use super::Backend;
use crate::config::{BackendConfig, RealtimeConfig};

/// REST client for the hosted backend platform
pub struct RestBackend {
    client: Client,
    config: RestConfig,
}

/// Connection settings for the hosted platform
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL (e.g., "https://xyzcompany.example.co")
    pub base_url: String,
    /// Public (anon) API key sent with every request
    pub api_key: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Realtime heartbeat interval in seconds
    pub heartbeat_interval_secs: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            request_timeout_ms: 10_000,
            heartbeat_interval_secs: 30,
        }
    }
}

impl RestConfig {
    pub fn from_config(backend: &BackendConfig, realtime: &RealtimeConfig) -> Self {
        Self {
            base_url: backend.url.trim_end_matches('/').to_string(),
            api_key: backend.anon_key.clone(),
            request_timeout_ms: backend.request_timeout_ms,
            heartbeat_interval_secs: realtime.heartbeat_interval_secs,
        }
    }
}

impl RestBackend {
    /// Create a new client with the given configuration
    pub fn new(config: RestConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url, path)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    /// Start a request carrying the project API key
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    /// Send a request and turn non-success statuses into `BackendError::Api`
    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(BackendError::Api {
            status: status.as_u16(),
            message: error_message(status, &text),
        })
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &str {
        "rest"
    }

    async fn health_check(&self) -> BackendResult<()> {
        let url = self.auth_url("health");
        self.send(self.request(Method::GET, &url)).await?;
        Ok(())
    }

    async fn exchange_code_for_session(&self, code: &str) -> BackendResult<Session> {
        let url = self.auth_url("token");
        let body = CodeExchangeRequest { auth_code: code };

        let response = self
            .send(
                self.request(Method::POST, &url)
                    .query(&[("grant_type", "pkce")])
                    .json(&body),
            )
            .await
            .map_err(|e| match e {
                BackendError::Api { message, .. } => BackendError::Auth(message),
                other => other,
            })?;

        Ok(response.json::<Session>().await?)
    }

    async fn get_session(&self, access_token: &str) -> BackendResult<Option<Session>> {
        let url = self.auth_url("user");

        let result = self
            .send(
                self.client
                    .get(&url)
                    .header("apikey", &self.config.api_key)
                    .bearer_auth(access_token),
            )
            .await;

        match result {
            Ok(response) => {
                let user: User = response.json().await?;
                Ok(Some(Session {
                    access_token: access_token.to_string(),
                    refresh_token: None,
                    expires_at: None,
                    user,
                }))
            }
            Err(BackendError::Api { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_up(&self, credentials: &Credentials) -> BackendResult<Account> {
        let url = self.auth_url("signup");
        let response = self
            .send(self.request(Method::POST, &url).json(credentials))
            .await?;

        let body: Value = response.json().await?;
        parse_account(body)
    }

    async fn insert(&self, table: &str, row: Row) -> BackendResult<Vec<Row>> {
        let url = self.table_url(table);
        let response = self
            .send(
                self.request(Method::POST, &url)
                    .header("Prefer", "return=representation")
                    .json(&[row]),
            )
            .await?;

        Ok(response.json::<Vec<Row>>().await?)
    }

    async fn select(&self, table: &str, query: &Query) -> BackendResult<Vec<Row>> {
        let url = self.table_url(table);
        let response = self
            .send(self.request(Method::GET, &url).query(&select_params(query)))
            .await?;

        Ok(response.json::<Vec<Row>>().await?)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<()> {
        let url = self.table_url(table);
        self.send(
            self.request(Method::DELETE, &url)
                .query(&filter_params(filters)),
        )
        .await?;
        Ok(())
    }

    async fn subscribe(&self, table: &str) -> BackendResult<Subscription> {
        realtime::subscribe(&self.config, table).await
    }
}

// ============================================
// Request/Response helpers
// ============================================

#[derive(Debug, Serialize)]
struct CodeExchangeRequest<'a> {
    auth_code: &'a str,
}

/// Error body shapes used by the platform's auth and table APIs
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Pull a human-readable message out of an error response
fn error_message(status: StatusCode, text: &str) -> String {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();

    body.msg
        .or(body.message)
        .or(body.error_description)
        .or(body.error)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                text.to_string()
            }
        })
}

/// Sign-up answers with either a bare user or a session wrapping one
fn parse_account(body: Value) -> BackendResult<Account> {
    let user = match body.get("user") {
        Some(user) if user.is_object() => user.clone(),
        _ => body,
    };
    Ok(serde_json::from_value(user)?)
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column.clone(), format!("eq.{}", f.value_text())))
        .collect()
}

fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filters));

    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend() -> RestBackend {
        RestBackend::new(RestConfig {
            base_url: "https://project.example.co".to_string(),
            api_key: "anon".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let backend = backend();
        assert_eq!(
            backend.auth_url("signup"),
            "https://project.example.co/auth/v1/signup"
        );
        assert_eq!(
            backend.table_url("memos"),
            "https://project.example.co/rest/v1/memos"
        );
    }

    #[test]
    fn test_from_config_trims_trailing_slash() {
        let backend_config = BackendConfig {
            url: "https://project.example.co/".to_string(),
            ..Default::default()
        };
        let config = RestConfig::from_config(&backend_config, &RealtimeConfig::default());
        assert_eq!(config.base_url, "https://project.example.co");
        assert_eq!(config.heartbeat_interval_secs, 30);
    }

    #[test]
    fn test_select_params() {
        let query = Query::new()
            .filter(Filter::eq("email", "a@example.com"))
            .order_by("created_at", false);
        let params = select_params(&query);

        assert_eq!(params[0], ("select".to_string(), "*".to_string()));
        assert_eq!(
            params[1],
            ("email".to_string(), "eq.a@example.com".to_string())
        );
        assert_eq!(
            params[2],
            ("order".to_string(), "created_at.desc".to_string())
        );
    }

    #[test]
    fn test_error_message_variants() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"msg":"User already registered"}"#),
            "User already registered"
        );
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Invalid code"}"#
            ),
            "Invalid code"
        );
        assert_eq!(
            error_message(StatusCode::CONFLICT, r#"{"message":"duplicate key"}"#),
            "duplicate key"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "oops"), "oops");
    }

    #[test]
    fn test_parse_account_shapes() {
        let bare = json!({"id": "u1", "email": "a@example.com"});
        assert_eq!(parse_account(bare).unwrap().id, "u1");

        let wrapped = json!({
            "access_token": "t",
            "user": {"id": "u2", "email": "b@example.com"}
        });
        assert_eq!(parse_account(wrapped).unwrap().email, "b@example.com");
    }
}
