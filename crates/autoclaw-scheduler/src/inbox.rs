//! Session Inbox — per-session prioritized message buffer.
//!
//! Two tiers: `High` entries go to the head of the session's buffer, `Normal`
//! entries to the tail. `dequeue` always pops the head, so every pending high
//! entry is served before any normal one. Among highs the most recently
//! enqueued is served first (LIFO); among normals the oldest (FIFO).

use std::collections::{HashMap, VecDeque};

use autoclaw_core::types::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Free-form metadata attached by the caller.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Lifecycle of a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Processing,
}

/// A message waiting for the session's loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub session_id: String,
    pub message: String,
    pub priority: Priority,
    pub status: EntryStatus,
    #[serde(default)]
    pub metadata: Metadata,
    pub enqueued_at: DateTime<Utc>,
}

/// Per-session buffer.
#[derive(Default)]
struct SessionQueue {
    entries: VecDeque<QueueEntry>,
    total_enqueued: u64,
}

impl SessionQueue {
    fn push(&mut self, entry: QueueEntry) {
        match entry.priority {
            Priority::High => self.entries.push_front(entry),
            Priority::Normal => self.entries.push_back(entry),
        }
        self.total_enqueued += 1;
    }
}

/// Prioritized inbox shared by every session.
///
/// One lock guards the whole session map; every operation is O(n) in the
/// session's pending entries at worst and never waits on anything but that
/// lock.
#[derive(Default)]
pub struct Inbox {
    sessions: Mutex<HashMap<String, SessionQueue>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for `session_id`.
    pub async fn enqueue(
        &self,
        session_id: &str,
        message: impl Into<String>,
        priority: Priority,
        metadata: Option<Metadata>,
    ) -> QueueEntry {
        let entry = QueueEntry {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            message: message.into(),
            priority,
            status: EntryStatus::Pending,
            metadata: metadata.unwrap_or_default(),
            enqueued_at: Utc::now(),
        };

        let mut sessions = self.sessions.lock().await;
        let queue = sessions.entry(session_id.to_string()).or_default();
        tracing::debug!(
            "📥 Inbox[{}] enqueue {} ({}, pending: {})",
            session_id,
            entry.id,
            priority,
            queue.entries.len()
        );
        queue.push(entry.clone());
        entry
    }

    /// Pop the head of the session's buffer, marking it as processing.
    pub async fn dequeue(&self, session_id: &str) -> Option<QueueEntry> {
        let mut sessions = self.sessions.lock().await;
        let mut entry = sessions.get_mut(session_id)?.entries.pop_front()?;
        entry.status = EntryStatus::Processing;
        tracing::debug!("📤 Inbox[{}] dequeue {}", session_id, entry.id);
        Some(entry)
    }

    /// Put a dequeued entry back at the head, pending again. Used when the
    /// loop stops before the entry was answered. Does not count as a new
    /// enqueue.
    pub async fn requeue_front(&self, mut entry: QueueEntry) {
        entry.status = EntryStatus::Pending;
        let mut sessions = self.sessions.lock().await;
        let queue = sessions.entry(entry.session_id.clone()).or_default();
        tracing::debug!("↩️ Inbox[{}] requeue {}", entry.session_id, entry.id);
        queue.entries.push_front(entry);
    }

    /// Look at the head without removing it.
    pub async fn peek(&self, session_id: &str) -> Option<QueueEntry> {
        let sessions = self.sessions.lock().await;
        sessions.get(session_id)?.entries.front().cloned()
    }

    pub async fn has_messages(&self, session_id: &str) -> bool {
        self.size(session_id).await > 0
    }

    /// Pending entries for a session.
    pub async fn size(&self, session_id: &str) -> usize {
        let sessions = self.sessions.lock().await;
        sessions.get(session_id).map_or(0, |q| q.entries.len())
    }

    /// Drop every pending entry of a session. Returns how many were removed.
    pub async fn clear(&self, session_id: &str) -> usize {
        let mut sessions = self.sessions.lock().await;
        let removed = sessions
            .remove(session_id)
            .map_or(0, |q| q.entries.len());
        if removed > 0 {
            tracing::info!("🧹 Inbox[{}] cleared {} pending messages", session_id, removed);
        }
        removed
    }

    /// Pending count for every session that has pending entries.
    pub async fn snapshot(&self) -> HashMap<String, usize> {
        let sessions = self.sessions.lock().await;
        sessions
            .iter()
            .filter(|(_, q)| !q.entries.is_empty())
            .map(|(id, q)| (id.clone(), q.entries.len()))
            .collect()
    }

    /// Messages ever enqueued for a session (survives dequeues, not `clear`).
    pub async fn total_enqueued(&self, session_id: &str) -> u64 {
        let sessions = self.sessions.lock().await;
        sessions.get(session_id).map_or(0, |q| q.total_enqueued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn drain(inbox: &Inbox, session: &str) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(entry) = inbox.dequeue(session).await {
            out.push(entry.message);
        }
        out
    }

    #[tokio::test]
    async fn test_high_before_normal() {
        let inbox = Inbox::new();
        inbox.enqueue("s1", "hello", Priority::High, None).await;
        inbox.enqueue("s1", "world", Priority::Normal, None).await;

        assert_eq!(inbox.dequeue("s1").await.unwrap().message, "hello");
        assert_eq!(inbox.dequeue("s1").await.unwrap().message, "world");
        assert!(inbox.dequeue("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_tie_break_order() {
        let inbox = Inbox::new();
        inbox.enqueue("s1", "n1", Priority::Normal, None).await;
        inbox.enqueue("s1", "h1", Priority::High, None).await;
        inbox.enqueue("s1", "n2", Priority::Normal, None).await;
        inbox.enqueue("s1", "h2", Priority::High, None).await;
        inbox.enqueue("s1", "n3", Priority::Normal, None).await;

        // Highs most-recent-first, then normals oldest-first.
        assert_eq!(drain(&inbox, "s1").await, vec!["h2", "h1", "n1", "n2", "n3"]);
    }

    #[tokio::test]
    async fn test_requeue_front_restores_head() {
        let inbox = Inbox::new();
        inbox.enqueue("s1", "first", Priority::Normal, None).await;
        inbox.enqueue("s1", "second", Priority::Normal, None).await;

        let taken = inbox.dequeue("s1").await.unwrap();
        assert_eq!(taken.status, EntryStatus::Processing);
        inbox.requeue_front(taken.clone()).await;

        let head = inbox.peek("s1").await.unwrap();
        assert_eq!(head.id, taken.id);
        assert_eq!(head.status, EntryStatus::Pending);
        assert_eq!(inbox.size("s1").await, 2);
        assert_eq!(inbox.total_enqueued("s1").await, 2);
        assert_eq!(drain(&inbox, "s1").await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_dequeue_marks_processing() {
        let inbox = Inbox::new();
        let queued = inbox.enqueue("s1", "hi", Priority::Normal, None).await;
        assert_eq!(queued.status, EntryStatus::Pending);

        let entry = inbox.dequeue("s1").await.unwrap();
        assert_eq!(entry.id, queued.id);
        assert_eq!(entry.status, EntryStatus::Processing);
    }

    #[tokio::test]
    async fn test_peek_is_non_destructive() {
        let inbox = Inbox::new();
        let mut meta = Metadata::new();
        meta.insert("channel".into(), "web".into());
        inbox.enqueue("s1", "a", Priority::Normal, Some(meta)).await;

        let peeked = inbox.peek("s1").await.unwrap();
        assert_eq!(peeked.message, "a");
        assert_eq!(peeked.metadata["channel"], "web");
        assert_eq!(inbox.size("s1").await, 1);
        assert!(inbox.has_messages("s1").await);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let inbox = Inbox::new();
        inbox.enqueue("s1", "for s1", Priority::Normal, None).await;
        inbox.enqueue("s2", "for s2", Priority::High, None).await;

        assert_eq!(inbox.dequeue("s2").await.unwrap().message, "for s2");
        assert!(inbox.dequeue("s2").await.is_none());
        assert_eq!(inbox.size("s1").await, 1);
        assert!(!inbox.has_messages("unknown").await);
    }

    #[tokio::test]
    async fn test_clear_and_snapshot() {
        let inbox = Inbox::new();
        inbox.enqueue("s1", "a", Priority::Normal, None).await;
        inbox.enqueue("s1", "b", Priority::High, None).await;
        inbox.enqueue("s2", "c", Priority::Normal, None).await;

        let snap = inbox.snapshot().await;
        assert_eq!(snap.get("s1"), Some(&2));
        assert_eq!(snap.get("s2"), Some(&1));

        assert_eq!(inbox.clear("s1").await, 2);
        assert_eq!(inbox.clear("s1").await, 0);
        assert_eq!(inbox.size("s1").await, 0);
        assert!(!inbox.snapshot().await.contains_key("s1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_lose_nothing() {
        let inbox = Arc::new(Inbox::new());
        let mut handles = Vec::new();
        for p in 0..8 {
            let inbox = inbox.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    let priority = if i % 5 == 0 { Priority::High } else { Priority::Normal };
                    inbox.enqueue("s1", format!("{p}-{i}"), priority, None).await;
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(inbox.size("s1").await, 400);
        assert_eq!(inbox.total_enqueued("s1").await, 400);

        let mut seen_normal = false;
        let mut count = 0;
        while let Some(entry) = inbox.dequeue("s1").await {
            if entry.priority == Priority::Normal {
                seen_normal = true;
            } else {
                assert!(!seen_normal, "high entry served after a normal one");
            }
            count += 1;
        }
        assert_eq!(count, 400);
    }
}
