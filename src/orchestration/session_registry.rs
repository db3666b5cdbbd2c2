//! Registry of in-flight sessions.
//!
//! Each entry carries its own lock and cancellation channel; nothing is
//! shared between sessions.

use crate::error::{AgendaError, Result};
use crate::models::{Session, SessionId};
use crate::state_machine::SessionState;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// One registered session
#[derive(Debug, Clone)]
pub struct SessionEntry {
    session: Arc<RwLock<Session>>,
    cancel: Arc<watch::Sender<bool>>,
}

impl SessionEntry {
    pub fn session(&self) -> &Arc<RwLock<Session>> {
        &self.session
    }

    pub fn cancel_sender(&self) -> &Arc<watch::Sender<bool>> {
        &self.cancel
    }

    /// Request cancellation; repeated requests are harmless
    pub fn request_cancel(&self) {
        self.cancel.send_replace(true);
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session; returns its entry and a cancellation receiver
    pub fn register(&self, session: Session) -> (SessionEntry, watch::Receiver<bool>) {
        let id = session.id();
        let (sender, receiver) = watch::channel(false);
        let entry = SessionEntry {
            session: Arc::new(RwLock::new(session)),
            cancel: Arc::new(sender),
        };
        self.sessions.insert(id, entry.clone());
        debug!(session_id = %id, active = self.sessions.len(), "Session registered");
        (entry, receiver)
    }

    pub fn cancel(&self, id: SessionId) -> Result<()> {
        let entry = self
            .sessions
            .get(&id)
            .ok_or(AgendaError::SessionNotFound(id))?;
        entry.request_cancel();
        Ok(())
    }

    pub fn state_of(&self, id: SessionId) -> Option<SessionState> {
        self.sessions.get(&id).map(|entry| entry.session.read().state())
    }

    pub fn remove(&self, id: SessionId) -> Option<SessionEntry> {
        self.sessions.remove(&id).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn active_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }
}
