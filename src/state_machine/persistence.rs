use super::events::SessionEvent;
use super::states::SessionState;
use crate::models::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded state transition of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTransition {
    pub session_id: SessionId,
    /// Monotonic position within the session's trail, starting at 1
    pub sort_key: u32,
    pub from_state: SessionState,
    pub to_state: SessionState,
    pub event: SessionEvent,
    pub cause: String,
    pub transitioned_at: DateTime<Utc>,
}

/// Append-only audit trail of one session.
///
/// The trail is enough to reconstruct why a session ended where it did: every
/// retry, conflict and fallback shows up as its own entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitionLog {
    entries: Vec<SessionTransition>,
}

impl TransitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persist_transition(
        &mut self,
        session_id: SessionId,
        from_state: SessionState,
        to_state: SessionState,
        event: SessionEvent,
    ) -> &SessionTransition {
        let sort_key = self.entries.len() as u32 + 1;
        let cause = event.describe();
        self.entries.push(SessionTransition {
            session_id,
            sort_key,
            from_state,
            to_state,
            event,
            cause,
            transitioned_at: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    /// State after the most recent transition, if any
    pub fn resolve_current_state(&self) -> Option<SessionState> {
        self.entries.last().map(|t| t.to_state)
    }

    pub fn entries(&self) -> &[SessionTransition] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count entries whose event has the given type name
    pub fn count_events(&self, event_type: &str) -> usize {
        self.entries
            .iter()
            .filter(|t| t.event.event_type() == event_type)
            .count()
    }
}
