//! Conversation threads and the session store.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::backend::{InMemorySessionBackend, SessionBackend};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    /// The user's text, or the assistant's normalized `data` body.
    pub content: Value,
    pub timestamp: DateTime<Utc>,
}

/// A single conversation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub messages: Vec<SessionMessage>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Keyed conversation history shared by all request handlers.
///
/// Sessions live for the process lifetime: there is no expiry and no size
/// bound. Storage is delegated to a [`SessionBackend`].
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.backend.len())
            .finish()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create an in-memory session store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(Arc::new(InMemorySessionBackend::default()))
    }

    pub fn with_backend(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    /// Return `id` if given, creating the session when it is unknown.
    ///
    /// Without an id (or with an empty one) a fresh UUID session is created.
    pub fn get_or_create(&self, id: Option<&str>) -> String {
        let id = match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        self.backend.insert_if_absent(Session::new(id.clone()));
        id
    }

    /// Append a turn. Returns `false` if the session does not exist.
    pub fn append(&self, id: &str, role: Role, content: Value) -> bool {
        self.backend.append(
            id,
            SessionMessage {
                role,
                content,
                timestamp: Utc::now(),
            },
        )
    }

    /// Get a snapshot of a session.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.backend.get(id)
    }

    /// Remove a session. Returns `false` if it did not exist.
    pub fn delete(&self, id: &str) -> bool {
        self.backend.remove(id)
    }

    /// Snapshots of all sessions, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<Session> {
        let mut sessions = self.backend.list();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        sessions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
