//! SSE session table.
//!
//! Maps a session id to the sender feeding that session's event stream. Entries are removed by
//! a [`SessionGuard`] owned by the stream, so a disconnect always frees the slot.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Outbound half of a session's event stream. Items are serialized JSON-RPC responses.
pub type SessionSender = mpsc::Sender<String>;

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionSender>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session_id: &str, sender: SessionSender) {
        self.sessions.write().insert(session_id.to_string(), sender);
    }

    /// Returns `true` if the session existed.
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }

    #[must_use]
    pub fn lookup(&self, session_id: &str) -> Option<SessionSender> {
        self.sessions.read().get(session_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Allocate a fresh session id, register `sender` under it and return the guard that
    /// unregisters it.
    #[must_use]
    pub fn open(self: &Arc<Self>, sender: SessionSender) -> SessionGuard {
        let session_id = Uuid::new_v4().to_string();
        self.insert(&session_id, sender);
        debug!(session_id = %session_id, live = self.len(), "session opened");
        SessionGuard {
            store: Arc::clone(self),
            session_id,
        }
    }
}

/// Removes its session from the store when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    store: Arc<SessionStore>,
    session_id: String,
}

impl SessionGuard {
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.store.remove(&self.session_id) {
            debug!(
                session_id = %self.session_id,
                live = self.store.len(),
                "session closed"
            );
        }
    }
}
