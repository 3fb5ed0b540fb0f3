//! Memo list state
//!
//! Local, newest-first view of memos. Every insert path goes through
//! [`MemoList::prepend`], which refuses ids already present, so a local
//! insert and its change feed echo can arrive in either order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short text memo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memo {
    /// Backend-assigned identifier
    pub id: i64,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Memo {
    pub fn new(id: i64, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            created_at: None,
        }
    }
}

/// Newest-first memo list with id-based duplicate guard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoList {
    items: Vec<Memo>,
}

impl MemoList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list. Returns whether anything changed.
    pub fn replace(&mut self, memos: Vec<Memo>) -> bool {
        if self.items == memos {
            return false;
        }
        self.items = memos;
        true
    }

    /// Put a memo at the head unless its id is already listed
    pub fn prepend(&mut self, memo: Memo) -> bool {
        if self.contains(memo.id) {
            return false;
        }
        self.items.insert(0, memo);
        true
    }

    /// Drop every entry with this id
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.items.len();
        self.items.retain(|m| m.id != id);
        self.items.len() != before
    }

    pub fn contains(&self, id: i64) -> bool {
        self.items.iter().any(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Memo] {
        &self.items
    }

    /// Contents in display order
    pub fn contents(&self) -> Vec<&str> {
        self.items.iter().map(|m| m.content.as_str()).collect()
    }
}
