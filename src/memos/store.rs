//! Typed access to the `memos` table

use serde_json::json;
use std::sync::Arc;

use super::list::Memo;
use crate::backend::{Backend, BackendError, BackendResult, ChangeEvent, Filter, Query, Row, Subscription};

/// Table holding memos on the backend platform
pub const MEMOS_TABLE: &str = "memos";

/// A change to the memo collection, decoded from the feed
#[derive(Debug, Clone, PartialEq)]
pub enum MemoChange {
    Inserted(Memo),
    Deleted(i64),
}

impl MemoChange {
    /// Decode a feed event. Events for other tables yield `None`.
    pub fn from_event(event: &ChangeEvent) -> BackendResult<Option<Self>> {
        if event.table() != MEMOS_TABLE {
            return Ok(None);
        }

        match event {
            ChangeEvent::Insert { new, .. } => Ok(Some(MemoChange::Inserted(decode_memo(new.clone())?))),
            ChangeEvent::Delete { old, .. } => {
                let id = old
                    .get("id")
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| BackendError::Decode("delete event without id".to_string()))?;
                Ok(Some(MemoChange::Deleted(id)))
            }
        }
    }
}

/// Memo table operations over an injected backend client
#[derive(Clone)]
pub struct MemoStore {
    backend: Arc<dyn Backend>,
}

impl MemoStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// All memos, newest first
    pub async fn fetch_recent(&self) -> BackendResult<Vec<Memo>> {
        let query = Query::new().order_by("created_at", false);
        let rows = self.backend.select(MEMOS_TABLE, &query).await?;
        rows.into_iter().map(decode_memo).collect()
    }

    /// Insert a memo and return the stored record
    pub async fn insert(&self, content: &str) -> BackendResult<Memo> {
        let rows = self
            .backend
            .insert(MEMOS_TABLE, json!({ "content": content }))
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no rows".to_string()))?;
        decode_memo(row)
    }

    /// Delete a memo by id
    pub async fn delete(&self, id: i64) -> BackendResult<()> {
        self.backend.delete(MEMOS_TABLE, &[Filter::eq("id", id)]).await
    }

    /// Live INSERT/DELETE feed for the memo table
    pub async fn subscribe(&self) -> BackendResult<Subscription> {
        self.backend.subscribe(MEMOS_TABLE).await
    }
}

fn decode_memo(row: Row) -> BackendResult<Memo> {
    Ok(serde_json::from_value(row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    #[tokio::test]
    async fn test_insert_and_fetch_newest_first() {
        let store = MemoStore::new(Arc::new(InMemoryBackend::new()));

        let first = store.insert("first").await.unwrap();
        let second = store.insert("second").await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let memos = store.fetch_recent().await.unwrap();
        let contents: Vec<_> = memos.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoStore::new(Arc::new(InMemoryBackend::new()));
        let memo = store.insert("gone soon").await.unwrap();

        store.delete(memo.id).await.unwrap();
        assert!(store.fetch_recent().await.unwrap().is_empty());
    }

    #[test]
    fn test_change_decoding() {
        let insert = ChangeEvent::Insert {
            table: MEMOS_TABLE.to_string(),
            new: json!({"id": 3, "content": "C"}),
        };
        assert_eq!(
            MemoChange::from_event(&insert).unwrap(),
            Some(MemoChange::Inserted(Memo::new(3, "C")))
        );

        let delete = ChangeEvent::Delete {
            table: MEMOS_TABLE.to_string(),
            old: json!({"id": 3}),
        };
        assert_eq!(
            MemoChange::from_event(&delete).unwrap(),
            Some(MemoChange::Deleted(3))
        );

        let other = ChangeEvent::Insert {
            table: "users".to_string(),
            new: json!({"email": "a@example.com"}),
        };
        assert_eq!(MemoChange::from_event(&other).unwrap(), None);

        let broken = ChangeEvent::Delete {
            table: MEMOS_TABLE.to_string(),
            old: json!({}),
        };
        assert!(MemoChange::from_event(&broken).is_err());
    }
}
