//! Backend Data Types
//!
//! Shapes exchanged with the backend platform: sessions, accounts,
//! table rows, query descriptions and change events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// A table row as returned by the platform (a JSON object)
pub type Row = Value;

/// Authenticated identity attached to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// An authenticated session issued by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

/// Account created by a sign-up request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub confirmation_sent_at: Option<DateTime<Utc>>,
}

/// Email + password pair sent to the platform on sign-up
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Equality filter on a single column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Check whether a row satisfies this filter
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column)
            .map(|v| compare_values(v, &self.value) == Ordering::Equal)
            .unwrap_or(false)
    }

    /// Value rendered the way REST query strings expect it
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Ordering on a single column
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Select query: equality filters plus an optional ordering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Order by a column
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Check whether a row satisfies every filter
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }
}

/// Change notification delivered by a subscription
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A row was inserted; carries the new row
    Insert { table: String, new: Row },
    /// A row was deleted; carries (at least the key of) the old row
    Delete { table: String, old: Row },
}

impl ChangeEvent {
    /// Table the change happened in
    pub fn table(&self) -> &str {
        match self {
            ChangeEvent::Insert { table, .. } | ChangeEvent::Delete { table, .. } => table,
        }
    }

    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Insert { .. } => "INSERT",
            ChangeEvent::Delete { .. } => "DELETE",
        }
    }
}

/// Total order over JSON scalars used for filtering and sorting.
///
/// Numbers compare numerically, strings lexically, everything else by its
/// JSON text. Values of different kinds compare by kind.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        _ => kind_rank(a)
            .cmp(&kind_rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_numbers_and_strings() {
        let row = json!({"id": 3, "email": "a@example.com"});
        assert!(Filter::eq("id", 3).matches(&row));
        assert!(!Filter::eq("id", 4).matches(&row));
        assert!(Filter::eq("email", "a@example.com").matches(&row));
        assert!(!Filter::eq("missing", 1).matches(&row));
    }

    #[test]
    fn test_filter_value_text() {
        assert_eq!(Filter::eq("id", 12).value_text(), "12");
        assert_eq!(Filter::eq("email", "x@y.z").value_text(), "x@y.z");
    }

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .filter(Filter::eq("email", "a@example.com"))
            .order_by("created_at", false);
        assert_eq!(query.filters.len(), 1);
        let order = query.order.unwrap();
        assert_eq!(order.column, "created_at");
        assert!(!order.ascending);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("a@example.com", "hunter22");
        let text = format!("{:?}", creds);
        assert!(text.contains("a@example.com"));
        assert!(!text.contains("hunter22"));
    }

    #[test]
    fn test_change_event_accessors() {
        let event = ChangeEvent::Delete {
            table: "memos".to_string(),
            old: json!({"id": 1}),
        };
        assert_eq!(event.table(), "memos");
        assert_eq!(event.kind(), "DELETE");
    }

    #[test]
    fn test_compare_values_mixed_kinds() {
        assert_eq!(compare_values(&json!(1), &json!(1.0)), Ordering::Equal);
        assert_eq!(compare_values(&json!("a"), &json!("b")), Ordering::Less);
        assert_eq!(compare_values(&json!(null), &json!(1)), Ordering::Less);
    }
}
