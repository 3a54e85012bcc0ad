//! Session-scoped override storage
//!
//! The resolver keeps one key per session (`theme`) holding the caller's
//! override. The store is a collaborator supplied by the surrounding
//! pipeline; reads and writes are independent last-write-wins operations
//! with no cross-request locking.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Key-value state scoped to one caller's session
pub trait SessionStore: Send + Sync {
    /// Read a value from a session, `None` if session or key is absent
    fn get(&self, session_id: &str, key: &str) -> Option<String>;

    /// Write a value into a session, creating the session if absent
    fn insert(&self, session_id: &str, key: &str, value: &str);

    /// Remove a key from a session, if both exist
    fn remove(&self, session_id: &str, key: &str);
}

/// In-memory session store
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str, key: &str) -> Option<String> {
        let sessions = self.sessions.read();
        sessions.get(session_id)?.get(key).cloned()
    }

    fn insert(&self, session_id: &str, key: &str, value: &str) {
        let mut sessions = self.sessions.write();
        sessions
            .entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, session_id: &str, key: &str) {
        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get_mut(session_id) {
            session.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_creates_session() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get("s1", "theme"), None);

        store.insert("s1", "theme", "corp");
        assert_eq!(store.get("s1", "theme"), Some("corp".to_string()));
        assert_eq!(store.get("s2", "theme"), None);
    }

    #[test]
    fn test_last_write_wins() {
        let store = MemorySessionStore::new();
        store.insert("s1", "theme", "first");
        store.insert("s1", "theme", "second");
        assert_eq!(store.get("s1", "theme"), Some("second".to_string()));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = MemorySessionStore::new();
        store.insert("s1", "theme", "corp");
        store.remove("s1", "theme");
        store.remove("s1", "theme");
        store.remove("missing", "theme");
        assert_eq!(store.get("s1", "theme"), None);
    }
}
