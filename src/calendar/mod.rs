//! # Calendar Collaborator
//!
//! Trait seam over the external calendar backend. The resolver reads busy
//! periods through it, the booking coordinator creates events through it.
//! [`InMemoryCalendar`] is the in-process implementation used by tests, the
//! benchmark and the `agenda-negotiate` binary.

pub mod in_memory;

use crate::models::{BookingKey, EventId, ParticipantId, TimeSlot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use in_memory::{CalendarEvent, CalendarFixture, InMemoryCalendar};

/// Errors a calendar backend can report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// The requested slot cannot be booked
    #[error("slot conflict: {reason}")]
    Conflict { reason: String },

    /// Backend could not be reached; the caller may retry
    #[error("calendar unreachable: {reason}")]
    Unreachable { reason: String },
}

/// Busy data for one participant over one window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyPeriods {
    pub intervals: Vec<TimeSlot>,
    /// Sub-windows the backend has no data for; empty means complete
    #[serde(default)]
    pub missing: Vec<TimeSlot>,
}

impl BusyPeriods {
    pub fn complete(intervals: Vec<TimeSlot>) -> Self {
        Self {
            intervals,
            missing: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Event the booking coordinator asks the calendar to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub booking_key: BookingKey,
    pub slot: TimeSlot,
    pub title: String,
    pub description: Option<String>,
    pub attendees: Vec<ParticipantId>,
}

/// External calendar backend.
///
/// Implementations are shared as `Arc<dyn CalendarClient>` across sessions and
/// must tolerate concurrent calls. `create_event` must be idempotent on
/// `EventDraft::booking_key`: a repeated key returns the original event id.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Busy intervals for `participant` inside `window`
    async fn query_busy(
        &self,
        participant: &ParticipantId,
        window: &TimeSlot,
    ) -> Result<BusyPeriods, CalendarError>;

    /// Create an event for every attendee
    async fn create_event(&self, draft: &EventDraft) -> Result<EventId, CalendarError>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}
