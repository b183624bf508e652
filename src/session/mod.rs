//! Session and conversation thread management.
//!
//! Sessions are keyed by a caller-supplied id or a generated UUID and hold the
//! ordered user/assistant turns of one conversation. They are kept in memory
//! for the lifetime of the process.
//!
//! # Architecture
//!
//! - [`Session`]: a snapshot of one conversation
//! - [`SessionStore`]: cloneable handle shared by all handlers
//! - [`SessionBackend`]: storage seam; [`InMemorySessionBackend`] by default
//!
//! # Example
//!
//! ```rust
//! use kicksight_gateway::session::{Role, SessionStore};
//!
//! let store = SessionStore::new();
//! let id = store.get_or_create(None);
//! store.append(&id, Role::User, serde_json::json!("Hello!"));
//!
//! assert_eq!(store.get(&id).unwrap().message_count(), 1);
//! ```

mod backend;
mod thread;

pub use backend::{InMemorySessionBackend, SessionBackend};
pub use thread::{Role, Session, SessionMessage, SessionStore};
