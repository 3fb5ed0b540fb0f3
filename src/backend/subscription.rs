//! Change Feed Subscription
//!
//! A cancellable handle on a live stream of [`ChangeEvent`]s for one table.
//! Releasing the handle, explicitly through [`Subscription::unsubscribe`] or
//! implicitly on drop, runs the backend-specific teardown exactly once.

use tokio::sync::mpsc;

use super::types::ChangeEvent;

type Teardown = Box<dyn FnOnce() + Send>;

/// Live change feed for a single table
pub struct Subscription {
    channel: String,
    events: mpsc::Receiver<ChangeEvent>,
    teardown: Option<Teardown>,
}

impl Subscription {
    /// Wrap an event receiver and the action that releases it upstream
    pub fn new(
        channel: impl Into<String>,
        events: mpsc::Receiver<ChangeEvent>,
        teardown: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            channel: channel.into(),
            events,
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Channel (table) name this subscription listens on
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next change. Returns `None` once the feed has closed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Stop receiving events and release the upstream channel
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            self.events.close();
            teardown();
            tracing::debug!(channel = %self.channel, "Subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_subscription() -> (Subscription, mpsc::Sender<ChangeEvent>, Arc<AtomicUsize>) {
        let (tx, rx) = mpsc::channel(8);
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let sub = Subscription::new("memos", rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (sub, tx, released)
    }

    #[tokio::test]
    async fn test_next_delivers_events() {
        let (mut sub, tx, _) = counting_subscription();
        let event = ChangeEvent::Insert {
            table: "memos".to_string(),
            new: json!({"id": 1, "content": "A"}),
        };
        tx.send(event.clone()).await.unwrap();
        assert_eq!(sub.next().await, Some(event));
    }

    #[test]
    fn test_unsubscribe_runs_teardown_once() {
        let (sub, _tx, released) = counting_subscription();
        sub.unsubscribe();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_runs_teardown() {
        let (sub, _tx, released) = counting_subscription();
        assert_eq!(sub.channel(), "memos");
        drop(sub);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
