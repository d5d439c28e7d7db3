use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// The pending multi-step flow a saved session is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// The user was asked what the new card should be named; the next message
    /// in the thread is treated as the card name.
    AwaitingCardName,
}

/// A saved continuation, keyed by thread id in the [`SessionStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub thread_id: String,
    pub state: ConversationState,
    pub context: HashMap<String, String>,
    /// When the continuation was registered; age against the store's TTL.
    pub created_at: Instant,
}

struct StoredSession {
    state: ConversationState,
    context: HashMap<String, String>,
    created_at: Instant,
}

/// Expiring key/value store of in-flight multi-step conversations.
///
/// Each thread id is logically single-writer (one turn at a time operates on
/// a given session), but the store supports concurrent operations on
/// different keys; a single mutex-guarded map satisfies that contract.
/// Eviction is lazy: expired entries are dropped on the read that finds them.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, StoredSession>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), ttl }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, StoredSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a pending continuation. Overwriting an existing entry for
    /// the same thread is not an error; the last writer wins.
    pub fn start(
        &self,
        thread_id: impl Into<String>,
        state: ConversationState,
        context: HashMap<String, String>,
    ) {
        let thread_id = thread_id.into();
        self.entries().insert(
            thread_id,
            StoredSession { state, context, created_at: Instant::now() },
        );
    }

    /// Returns a copy of the live session for `thread_id`, evicting it first
    /// if it has outlived the TTL.
    pub fn get(&self, thread_id: &str) -> Option<Session> {
        let mut entries = self.entries();
        if Self::expired_at(entries.get(thread_id)?, self.ttl) {
            entries.remove(thread_id);
            return None;
        }
        entries.get(thread_id).map(|stored| Self::snapshot(thread_id, stored))
    }

    /// Atomically reads and removes the live session for `thread_id`.
    ///
    /// This is the continuation path: at most one turn can resume a saved
    /// session, so the read and the delete happen under the same lock.
    pub fn take(&self, thread_id: &str) -> Option<Session> {
        let mut entries = self.entries();
        let stored = entries.remove(thread_id)?;
        if Self::expired_at(&stored, self.ttl) {
            return None;
        }
        Some(Self::snapshot(thread_id, &stored))
    }

    /// Merges `updates` into the session context. Returns false (a no-op,
    /// not an error) when no session exists for the thread.
    pub fn update(&self, thread_id: &str, updates: HashMap<String, String>) -> bool {
        let mut entries = self.entries();
        match entries.get_mut(thread_id) {
            Some(stored) => {
                stored.context.extend(updates);
                true
            }
            None => false,
        }
    }

    /// Unconditional, idempotent removal.
    pub fn end(&self, thread_id: &str) {
        self.entries().remove(thread_id);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn expired_at(stored: &StoredSession, ttl: Duration) -> bool {
        stored.created_at.elapsed() > ttl
    }

    fn snapshot(thread_id: &str, stored: &StoredSession) -> Session {
        Session {
            thread_id: thread_id.to_string(),
            state: stored.state,
            context: stored.context.clone(),
            created_at: stored.created_at,
        }
    }

    /// Rewinds a session's creation time, simulating age without sleeping.
    #[cfg(test)]
    fn backdate(&self, thread_id: &str, age: Duration) {
        if let Some(stored) = self.entries().get_mut(thread_id) {
            stored.created_at = Instant::now() - age;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{ConversationState, SessionStore};

    fn context(list_name: &str) -> HashMap<String, String> {
        HashMap::from([("list_name".to_string(), list_name.to_string())])
    }

    #[test]
    fn start_and_get_round_trip() {
        let store = SessionStore::default();
        store.start("1730000000.1000", ConversationState::AwaitingCardName, context("To Do"));

        let session = store.get("1730000000.1000").expect("session should be live");
        assert_eq!(session.state, ConversationState::AwaitingCardName);
        assert_eq!(session.context.get("list_name").map(String::as_str), Some("To Do"));
    }

    #[test]
    fn snapshot_carries_the_creation_time() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.start("t-1", ConversationState::AwaitingCardName, context("To Do"));
        store.backdate("t-1", Duration::from_secs(42));

        let session = store.get("t-1").expect("session should be live");
        assert!(session.created_at.elapsed() >= Duration::from_secs(42));
        assert!(session.created_at.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn overwrite_wins_for_same_thread() {
        let store = SessionStore::default();
        store.start("t-1", ConversationState::AwaitingCardName, context("To Do"));
        store.start("t-1", ConversationState::AwaitingCardName, context("Done"));

        let session = store.get("t-1").expect("session should be live");
        assert_eq!(session.context.get("list_name").map(String::as_str), Some("Done"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expired_sessions_are_evicted_on_get() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.start("t-1", ConversationState::AwaitingCardName, context("To Do"));
        store.backdate("t-1", Duration::from_secs(61));

        assert!(store.get("t-1").is_none());
        // Eviction is a side effect: a second get also misses and end is a no-op.
        assert!(store.get("t-1").is_none());
        assert!(store.is_empty());
        store.end("t-1");
    }

    #[test]
    fn take_removes_exactly_once() {
        let store = SessionStore::default();
        store.start("t-1", ConversationState::AwaitingCardName, context("To Do"));

        assert!(store.take("t-1").is_some());
        assert!(store.take("t-1").is_none());
    }

    #[test]
    fn take_drops_expired_sessions() {
        let store = SessionStore::new(Duration::from_secs(10));
        store.start("t-1", ConversationState::AwaitingCardName, context("To Do"));
        store.backdate("t-1", Duration::from_secs(11));

        assert!(store.take("t-1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn update_merges_into_context_and_misses_are_no_ops() {
        let store = SessionStore::default();
        store.start("t-1", ConversationState::AwaitingCardName, context("To Do"));

        let merged = store.update(
            "t-1",
            HashMap::from([("description".to_string(), "from button".to_string())]),
        );
        assert!(merged);

        let session = store.get("t-1").expect("session should be live");
        assert_eq!(session.context.len(), 2);

        assert!(!store.update("t-missing", HashMap::new()));
    }
}
