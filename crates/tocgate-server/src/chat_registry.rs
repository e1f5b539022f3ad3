//! Per-connection chat room registry.
//!
//! Maps small integer chat ids (what the TOC client sees) to room metadata
//! and the backend chat session serving that room. Ids are allocated from a
//! monotonic per-registry counter and never reused; a room that compares
//! equal (exchange, cookie, instance) to a known one keeps its id. The
//! registry references sessions, it does not own them — teardown is the
//! connection handler's job.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use tocgate_core::Session;
use tocgate_proto::chat::ChatRoomKey;

#[derive(Debug)]
struct Entry {
    room: ChatRoomKey,
    session: Option<Arc<Session>>,
}

#[derive(Debug, Default)]
struct Rooms {
    next_id: u32,
    ids: HashMap<ChatRoomKey, u32>,
    entries: HashMap<u32, Entry>,
}

/// Thread-safe chat id ↔ room ↔ session mapping for one connection.
#[derive(Debug, Default)]
pub struct ChatRegistry {
    inner: RwLock<Rooms>,
}

impl ChatRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `room`, allocating one on first sight. Structurally equal
    /// rooms always map to the same id.
    pub fn add(&self, room: ChatRoomKey) -> u32 {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = inner.ids.get(&room) {
            return *id;
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.ids.insert(room.clone(), id);
        inner.entries.insert(id, Entry { room, session: None });
        id
    }

    /// Room metadata for `chat_id`.
    pub fn lookup_room(&self, chat_id: u32) -> Option<ChatRoomKey> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(&chat_id).map(|entry| entry.room.clone())
    }

    /// Attach the backend session serving `chat_id`. `false` for unknown
    /// ids.
    pub fn register_session(&self, chat_id: u32, session: Arc<Session>) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match inner.entries.get_mut(&chat_id) {
            Some(entry) => {
                entry.session = Some(session);
                true
            },
            None => false,
        }
    }

    /// The backend session serving `chat_id`, if attached.
    pub fn retrieve_session(&self, chat_id: u32) -> Option<Arc<Session>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(&chat_id).and_then(|entry| entry.session.clone())
    }

    /// Detach and return the session for `chat_id`. The room and its id
    /// stay known.
    pub fn remove_session(&self, chat_id: u32) -> Option<Arc<Session>> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get_mut(&chat_id).and_then(|entry| entry.session.take())
    }

    /// Snapshot of every attached (chat id, session) pair.
    pub fn sessions(&self) -> Vec<(u32, Arc<Session>)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .entries
            .iter()
            .filter_map(|(id, entry)| entry.session.clone().map(|sess| (*id, sess)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use tocgate_core::ScreenName;

    use super::*;

    fn room(cookie: &str) -> ChatRoomKey {
        ChatRoomKey { exchange: 4, cookie: cookie.to_owned(), instance: 0 }
    }

    #[test]
    fn add_is_idempotent_on_structural_equality() {
        let registry = ChatRegistry::new();
        let id = registry.add(room("4-0-lobby"));
        assert_eq!(registry.add(room("4-0-lobby")), id);
        assert_ne!(registry.add(room("4-0-den")), id);
    }

    #[test]
    fn lookup_returns_what_was_added() {
        let registry = ChatRegistry::new();
        let id = registry.add(room("4-0-lobby"));
        assert_eq!(registry.lookup_room(id), Some(room("4-0-lobby")));
        assert_eq!(registry.lookup_room(999), None);
    }

    #[test]
    fn ids_are_never_reused() {
        let registry = ChatRegistry::new();
        let first = registry.add(room("a"));
        let second = registry.add(room("b"));
        assert!(second > first);
        registry.remove_session(first);
        let third = registry.add(room("c"));
        assert!(third > second);
    }

    #[test]
    fn session_lifecycle() {
        let registry = ChatRegistry::new();
        let id = registry.add(room("4-0-lobby"));
        assert!(registry.retrieve_session(id).is_none());

        let sess = Arc::new(Session::new(ScreenName::new("alice")));
        assert!(registry.register_session(id, sess));
        assert!(registry.retrieve_session(id).is_some());
        assert_eq!(registry.sessions().len(), 1);

        assert!(registry.remove_session(id).is_some());
        assert!(registry.retrieve_session(id).is_none());
        assert!(registry.sessions().is_empty());
        // The room itself survives its session.
        assert_eq!(registry.lookup_room(id), Some(room("4-0-lobby")));
    }

    #[test]
    fn register_on_unknown_id_fails() {
        let registry = ChatRegistry::new();
        let sess = Arc::new(Session::new(ScreenName::new("alice")));
        assert!(!registry.register_session(7, sess));
    }
}
