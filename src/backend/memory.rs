//! In-Memory Backend Platform
//!
//! Implements the full [`Backend`] contract inside the process: accounts,
//! sessions, one-shot authorization codes, tables with backend-assigned ids
//! and a broadcast change feed. Used for local development and as the
//! substitutable fake in tests, where request counting and one-shot failure
//! injection make error paths observable.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use super::error::{BackendError, BackendResult};
use super::subscription::Subscription;
use super::types::{compare_values, Account, ChangeEvent, Credentials, Filter, Query, Row, Session, User};
use super::Backend;

/// Minimum password length enforced by the platform
const MIN_PASSWORD_LEN: usize = 6;

/// Session lifetime handed out with new sessions
const SESSION_TTL_SECS: i64 = 3600;

/// Capacity of the change feed broadcast channel
const FEED_CAPACITY: usize = 1024;

/// Capacity of each subscription's event queue
const SUBSCRIPTION_CAPACITY: usize = 64;

/// Backend operations, used to target failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ExchangeCode,
    GetSession,
    SignUp,
    Insert,
    Select,
    Delete,
    Subscribe,
}

/// Backend platform held entirely in memory
pub struct InMemoryBackend {
    state: RwLock<PlatformState>,
    changes: broadcast::Sender<ChangeEvent>,
    requests: AtomicUsize,
    active_subscriptions: Arc<AtomicUsize>,
    failures: Mutex<HashMap<Operation, String>>,
}

#[derive(Default)]
struct PlatformState {
    /// email → account
    accounts: HashMap<String, Account>,
    /// access token → session
    sessions: HashMap<String, Session>,
    /// authorization code → email
    codes: HashMap<String, String>,
    tables: HashMap<String, Table>,
}

struct Table {
    rows: Vec<Row>,
    next_id: i64,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(FEED_CAPACITY);

        Self {
            state: RwLock::new(PlatformState::default()),
            changes,
            requests: AtomicUsize::new(0),
            active_subscriptions: Arc::new(AtomicUsize::new(0)),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a one-shot authorization code for an email, as an identity
    /// provider redirect would. Creates the account if it does not exist.
    pub async fn issue_code(&self, email: &str) -> String {
        let mut state = self.state.write().await;
        state
            .accounts
            .entry(email.to_string())
            .or_insert_with(|| new_account(email));

        let code = Uuid::new_v4().simple().to_string();
        state.codes.insert(code.clone(), email.to_string());
        code
    }

    /// Create a session for an email directly, bypassing the code flow
    pub async fn create_session(&self, email: &str) -> Session {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .entry(email.to_string())
            .or_insert_with(|| new_account(email))
            .clone();

        let session = new_session(&account);
        state
            .sessions
            .insert(session.access_token.clone(), session.clone());
        session
    }

    /// Make the next call of `operation` fail with `message`
    pub fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(operation, message.into());
        }
    }

    /// Number of contract calls received so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of subscriptions not yet released
    pub fn active_subscriptions(&self) -> usize {
        self.active_subscriptions.load(Ordering::SeqCst)
    }

    /// Snapshot of a table's rows in insertion order
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Count a request and consume any failure planned for it
    fn track(&self, operation: Operation) -> BackendResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let planned = self
            .failures
            .lock()
            .ok()
            .and_then(|mut failures| failures.remove(&operation));

        match planned {
            Some(message) => {
                tracing::debug!(?operation, %message, "Injected backend failure");
                Err(BackendError::Api {
                    status: 500,
                    message,
                })
            }
            None => Ok(()),
        }
    }

    fn publish(&self, event: ChangeEvent) {
        // No receivers is fine: nobody is subscribed yet
        let _ = self.changes.send(event);
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> BackendResult<()> {
        Ok(())
    }

    async fn exchange_code_for_session(&self, code: &str) -> BackendResult<Session> {
        self.track(Operation::ExchangeCode)?;

        let mut state = self.state.write().await;
        let email = state
            .codes
            .remove(code)
            .ok_or_else(|| BackendError::Auth("invalid flow state, no valid flow state found".to_string()))?;

        let account = state
            .accounts
            .get(&email)
            .cloned()
            .ok_or_else(|| BackendError::Auth("User not found".to_string()))?;

        let session = new_session(&account);
        state
            .sessions
            .insert(session.access_token.clone(), session.clone());

        tracing::debug!(email = %email, "Exchanged authorization code");
        Ok(session)
    }

    async fn get_session(&self, access_token: &str) -> BackendResult<Option<Session>> {
        self.track(Operation::GetSession)?;

        let state = self.state.read().await;
        let session = state.sessions.get(access_token).cloned();

        Ok(session.filter(|s| {
            s.expires_at
                .map(|exp| exp > Utc::now().timestamp())
                .unwrap_or(true)
        }))
    }

    async fn sign_up(&self, credentials: &Credentials) -> BackendResult<Account> {
        self.track(Operation::SignUp)?;

        if credentials.email.is_empty() {
            return Err(BackendError::Api {
                status: 400,
                message: "Anonymous sign-ins are disabled".to_string(),
            });
        }

        if credentials.password.len() < MIN_PASSWORD_LEN {
            return Err(BackendError::Api {
                status: 422,
                message: format!(
                    "Password should be at least {} characters.",
                    MIN_PASSWORD_LEN
                ),
            });
        }

        let mut state = self.state.write().await;
        if state.accounts.contains_key(&credentials.email) {
            return Err(BackendError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }

        let mut account = new_account(&credentials.email);
        account.confirmation_sent_at = Some(Utc::now());
        state
            .accounts
            .insert(credentials.email.clone(), account.clone());

        tracing::debug!(email = %credentials.email, "Account created");
        Ok(account)
    }

    async fn insert(&self, table: &str, row: Row) -> BackendResult<Vec<Row>> {
        self.track(Operation::Insert)?;

        let Value::Object(mut fields) = row else {
            return Err(BackendError::Api {
                status: 400,
                message: "Row must be a JSON object".to_string(),
            });
        };

        let stored = {
            let mut state = self.state.write().await;
            let table_state = state.tables.entry(table.to_string()).or_default();

            // Explicit integer ids push the sequence past them
            match fields.get("id").and_then(Value::as_i64) {
                Some(id) => table_state.next_id = table_state.next_id.max(id + 1),
                None => {
                    let id = table_state.next_id;
                    table_state.next_id += 1;
                    fields.entry("id").or_insert_with(|| json!(id));
                }
            }
            fields
                .entry("created_at")
                .or_insert_with(|| json!(Utc::now().to_rfc3339()));

            let stored = Value::Object(fields);
            table_state.rows.push(stored.clone());
            stored
        };

        self.publish(ChangeEvent::Insert {
            table: table.to_string(),
            new: stored.clone(),
        });

        Ok(vec![stored])
    }

    async fn select(&self, table: &str, query: &Query) -> BackendResult<Vec<Row>> {
        self.track(Operation::Select)?;

        let state = self.state.read().await;
        let mut rows: Vec<Row> = state
            .tables
            .get(table)
            .map(|t| t.rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = column_ordering(a, b, &order.column)
                    .then_with(|| column_ordering(a, b, "id"));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        Ok(rows)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<()> {
        self.track(Operation::Delete)?;

        if filters.is_empty() {
            return Err(BackendError::Api {
                status: 400,
                message: "DELETE requires a WHERE clause".to_string(),
            });
        }

        let removed = {
            let mut state = self.state.write().await;
            match state.tables.get_mut(table) {
                Some(table_state) => {
                    let (removed, kept): (Vec<Row>, Vec<Row>) = table_state
                        .rows
                        .drain(..)
                        .partition(|row| filters.iter().all(|f| f.matches(row)));
                    table_state.rows = kept;
                    removed
                }
                None => Vec::new(),
            }
        };

        for old in removed {
            self.publish(ChangeEvent::Delete {
                table: table.to_string(),
                old,
            });
        }

        Ok(())
    }

    async fn subscribe(&self, table: &str) -> BackendResult<Subscription> {
        self.track(Operation::Subscribe)?;

        let mut feed = self.changes.subscribe();
        let (tx, events) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let channel = table.to_string();

        let forward = tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(event) => {
                        if event.table() == channel && tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(channel = %channel, skipped, "Change feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.active_subscriptions.fetch_add(1, Ordering::SeqCst);
        let active = Arc::clone(&self.active_subscriptions);

        Ok(Subscription::new(table, events, move || {
            forward.abort();
            active.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}

fn new_account(email: &str) -> Account {
    Account {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        confirmation_sent_at: None,
    }
}

fn new_session(account: &Account) -> Session {
    Session {
        access_token: Uuid::new_v4().to_string(),
        refresh_token: Some(Uuid::new_v4().simple().to_string()),
        expires_at: Some(Utc::now().timestamp() + SESSION_TTL_SECS),
        user: User {
            id: account.id.clone(),
            email: account.email.clone(),
        },
    }
}

fn column_ordering(a: &Row, b: &Row, column: &str) -> CmpOrdering {
    let null = Value::Null;
    compare_values(a.get(column).unwrap_or(&null), b.get(column).unwrap_or(&null))
}
