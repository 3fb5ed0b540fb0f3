//! Memo Board
//!
//! View-model for the memo page: fetch, insert and delete against the
//! backend, plus a live feed that applies remote changes. Backend failures
//! are logged and leave the list as it was.
//!
//! State lives in a `watch` channel. Mutations go through
//! `send_if_modified`, so observers only see a new snapshot when the list
//! actually changed, and a local insert racing its own feed echo lands once.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::list::{Memo, MemoList};
use super::store::{MemoChange, MemoStore};
use crate::backend::{Backend, BackendResult};

/// Memo page state bound to a backend client
pub struct MemoBoard {
    store: MemoStore,
    memos: watch::Sender<MemoList>,
}

impl MemoBoard {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (memos, _) = watch::channel(MemoList::new());
        Self {
            store: MemoStore::new(backend),
            memos,
        }
    }

    /// Current list, newest first
    pub fn snapshot(&self) -> Vec<Memo> {
        self.memos.borrow().as_slice().to_vec()
    }

    /// Receiver notified whenever the list changes
    pub fn watch(&self) -> watch::Receiver<MemoList> {
        self.memos.subscribe()
    }

    /// Reload all memos and replace the list wholesale
    pub async fn fetch(&self) -> bool {
        match self.store.fetch_recent().await {
            Ok(memos) => {
                tracing::debug!(count = memos.len(), "Fetched memos");
                self.memos.send_if_modified(|list| list.replace(memos));
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching memos");
                false
            }
        }
    }

    /// Create a memo and show it at the head of the list.
    ///
    /// Whitespace-only content is ignored without contacting the backend.
    pub async fn add(&self, content: &str) -> Option<Memo> {
        if content.trim().is_empty() {
            return None;
        }

        match self.store.insert(content).await {
            Ok(memo) => {
                let local = memo.clone();
                self.memos.send_if_modified(|list| list.prepend(local));
                Some(memo)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error inserting memo");
                None
            }
        }
    }

    /// Delete a memo and drop it from the list
    pub async fn delete(&self, id: i64) -> bool {
        match self.store.delete(id).await {
            Ok(()) => {
                self.memos.send_if_modified(|list| list.remove(id));
                true
            }
            Err(e) => {
                tracing::error!(memo_id = id, error = %e, "Error deleting memo");
                false
            }
        }
    }

    /// Apply a change delivered by the live feed
    pub fn apply(&self, change: MemoChange) -> bool {
        self.memos.send_if_modified(|list| match change {
            MemoChange::Inserted(memo) => list.prepend(memo),
            MemoChange::Deleted(id) => list.remove(id),
        })
    }

    /// Subscribe to the live feed, load the list, and start applying changes.
    ///
    /// The subscription is opened before the fetch; events that arrive while
    /// the fetch is in flight queue up and are applied after it.
    pub async fn mount(self: &Arc<Self>) -> BackendResult<LiveFeed> {
        let mut subscription = self.store.subscribe().await?;
        self.fetch().await;

        let board = Arc::clone(self);
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                match MemoChange::from_event(&event) {
                    Ok(Some(change)) => {
                        board.apply(change);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, kind = event.kind(), "Ignoring malformed memo change");
                    }
                }
            }
            tracing::debug!(channel = subscription.channel(), "Memo feed closed");
        });

        Ok(LiveFeed { task: Some(task) })
    }
}

/// Running live feed. Dropping it releases the backend subscription.
pub struct LiveFeed {
    task: Option<JoinHandle<()>>,
}

impl LiveFeed {
    /// Whether the feed is still receiving changes
    pub fn is_active(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Stop the feed and wait until the subscription has been released
    pub async fn unmount(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancellation is the expected outcome
            let _ = task.await;
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
