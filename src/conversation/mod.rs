//! Conversation state management
//!
//! In-memory store for per-thread conversation state. Threads are created
//! lazily, never evicted, and live only for the process lifetime. Each thread
//! carries its own turn lock so concurrent requests against the same thread
//! serialize while different threads proceed in parallel.

pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{AgentError, Result};

pub use types::{ConversationState, Message, Role, ToolCall};

/// Thread-safe store of conversation threads.
///
/// Cloning is cheap and shares the underlying maps. Reads return snapshot
/// clones; callers never hold the store's internal locks across an await
/// point of their own.
#[derive(Clone)]
pub struct ConversationStore {
    threads: Arc<RwLock<HashMap<String, ConversationState>>>,
    // One lock per thread id, serializing whole turns against the same thread
    turn_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
            turn_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get a snapshot of a thread, creating it if it does not exist yet.
    pub async fn get_or_create(&self, thread_id: &str) -> ConversationState {
        let mut threads = self.threads.write().await;
        threads
            .entry(thread_id.to_string())
            .or_insert_with(|| {
                debug!(thread_id = %thread_id, "creating conversation thread");
                ConversationState::new(thread_id)
            })
            .clone()
    }

    /// Get a snapshot of an existing thread.
    pub async fn get(&self, thread_id: &str) -> Option<ConversationState> {
        self.threads.read().await.get(thread_id).cloned()
    }

    /// Append one message to a thread. The thread must exist.
    pub async fn append(&self, thread_id: &str, message: Message) -> Result<()> {
        let mut threads = self.threads.write().await;
        let state = threads
            .get_mut(thread_id)
            .ok_or_else(|| AgentError::Conversation(format!("unknown thread: {}", thread_id)))?;
        state.push(message);
        Ok(())
    }

    /// Append several messages atomically, preserving their order.
    pub async fn append_all(&self, thread_id: &str, messages: Vec<Message>) -> Result<()> {
        let mut threads = self.threads.write().await;
        let state = threads
            .get_mut(thread_id)
            .ok_or_else(|| AgentError::Conversation(format!("unknown thread: {}", thread_id)))?;
        for message in messages {
            state.push(message);
        }
        Ok(())
    }

    /// Full message history of a thread, oldest first.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.threads
            .read()
            .await
            .get(thread_id)
            .map(|s| s.messages.clone())
            .ok_or_else(|| AgentError::Conversation(format!("unknown thread: {}", thread_id)))
    }

    /// Associate a customer id with a thread. A later call with a different
    /// id overwrites; None is ignored.
    pub async fn set_customer(&self, thread_id: &str, customer_id: Option<i64>) -> Result<()> {
        let Some(customer_id) = customer_id else {
            return Ok(());
        };
        let mut threads = self.threads.write().await;
        let state = threads
            .get_mut(thread_id)
            .ok_or_else(|| AgentError::Conversation(format!("unknown thread: {}", thread_id)))?;
        state.customer_id = Some(customer_id);
        Ok(())
    }

    /// The turn lock for a thread, created on first use.
    ///
    /// Callers hold the returned lock for the duration of one turn so that
    /// concurrent messages to the same thread cannot interleave their
    /// appends.
    pub async fn turn_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of threads currently held.
    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_is_lazy_and_stable() {
        let store = ConversationStore::new();
        assert_eq!(store.thread_count().await, 0);

        let a = store.get_or_create("t1").await;
        let b = store.get_or_create("t1").await;
        assert_eq!(a.thread_id, b.thread_id);
        assert_eq!(a.created_at, b.created_at);
        assert_eq!(store.thread_count().await, 1);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = ConversationStore::new();
        store.get_or_create("t1").await;

        store.append("t1", Message::user("first")).await.unwrap();
        store.append("t1", Message::assistant("second")).await.unwrap();
        store.append("t1", Message::user("third")).await.unwrap();

        let history = store.history("t1").await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_append_to_unknown_thread_fails() {
        let store = ConversationStore::new();
        let err = store.append("nope", Message::user("x")).await.unwrap_err();
        assert!(err.to_string().contains("unknown thread"));
    }

    #[tokio::test]
    async fn test_append_all_keeps_block_order() {
        let store = ConversationStore::new();
        store.get_or_create("t1").await;
        store
            .append_all(
                "t1",
                vec![
                    Message::tool_result("c1", "r1"),
                    Message::tool_result("c2", "r2"),
                ],
            )
            .await
            .unwrap();

        let history = store.history("t1").await.unwrap();
        assert_eq!(history[0].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(history[1].tool_call_id.as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_thread_isolation() {
        let store = ConversationStore::new();
        store.get_or_create("a").await;
        store.get_or_create("b").await;

        store.append("a", Message::user("for a")).await.unwrap();
        store.append("b", Message::user("for b")).await.unwrap();

        let a = store.history("a").await.unwrap();
        let b = store.history("b").await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(a[0].content, "for a");
        assert_eq!(b[0].content, "for b");
    }

    #[tokio::test]
    async fn test_set_customer() {
        let store = ConversationStore::new();
        store.get_or_create("t1").await;

        store.set_customer("t1", None).await.unwrap();
        assert_eq!(store.get("t1").await.unwrap().customer_id, None);

        store.set_customer("t1", Some(42)).await.unwrap();
        assert_eq!(store.get("t1").await.unwrap().customer_id, Some(42));
    }

    #[tokio::test]
    async fn test_turn_lock_is_per_thread() {
        let store = ConversationStore::new();
        let lock_a1 = store.turn_lock("a").await;
        let lock_a2 = store.turn_lock("a").await;
        let lock_b = store.turn_lock("b").await;

        assert!(Arc::ptr_eq(&lock_a1, &lock_a2));
        assert!(!Arc::ptr_eq(&lock_a1, &lock_b));

        // Holding a's lock must not block b's.
        let _guard = lock_a1.lock().await;
        let b_guard = lock_b.try_lock();
        assert!(b_guard.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_appends_all_land() {
        let store = ConversationStore::new();
        store.get_or_create("t1").await;

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append("t1", Message::user(&format!("msg-{}", i)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.history("t1").await.unwrap().len(), 10);
    }
}
