//! Session storage backends.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{PoisonError, RwLock};

use super::thread::{Session, SessionMessage};

/// Storage behind a [`SessionStore`](super::SessionStore).
///
/// Implementations must make each call atomic with respect to the others;
/// handlers on different worker threads append to the same session.
pub trait SessionBackend: Send + Sync + Debug {
    fn get(&self, id: &str) -> Option<Session>;

    /// Store `session` unless its id is already present.
    fn insert_if_absent(&self, session: Session);

    /// Returns `false` if the session does not exist.
    fn append(&self, id: &str, message: SessionMessage) -> bool;

    /// Returns `false` if the session did not exist.
    fn remove(&self, id: &str) -> bool;

    fn list(&self) -> Vec<Session>;

    fn len(&self) -> usize;
}

/// Process-local backend: one map behind a single coarse lock.
#[derive(Debug, Default)]
pub struct InMemorySessionBackend {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionBackend for InMemorySessionBackend {
    fn get(&self, id: &str) -> Option<Session> {
        let guard = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(id).cloned()
    }

    fn insert_if_absent(&self, session: Session) {
        let mut guard = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        guard.entry(session.id.clone()).or_insert(session);
    }

    fn append(&self, id: &str, message: SessionMessage) -> bool {
        let mut guard = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match guard.get_mut(id) {
            Some(session) => {
                session.messages.push(message);
                true
            }
            None => false,
        }
    }

    fn remove(&self, id: &str) -> bool {
        let mut guard = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(id).is_some()
    }

    fn list(&self) -> Vec<Session> {
        let guard = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        guard.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
