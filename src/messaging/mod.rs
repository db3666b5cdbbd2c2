//! # Agent Messages
//!
//! The closed set of messages exchanged between the orchestrator and the
//! scheduler/calendar agents. Every hop is one request variant and one
//! response variant; routing matches them exhaustively.

use crate::models::{
    AvailabilityMap, BookingKey, EventId, ParticipantId, SchedulingRequest, SessionId, TimeSlot,
};
use crate::orchestration::policy::Hop;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Availability hop request: busy data for every participant over a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub session_id: SessionId,
    pub participants: Vec<ParticipantId>,
    pub window: TimeSlot,
    /// Per-participant query timeout
    pub timeout_ms: u64,
}

impl AvailabilityRequest {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Availability hop response: one record per requested participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub session_id: SessionId,
    pub window: TimeSlot,
    pub records: AvailabilityMap,
}

/// Booking hop request for one candidate slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub session_id: SessionId,
    pub slot: TimeSlot,
    pub title: String,
    pub description: Option<String>,
    pub attendees: Vec<ParticipantId>,
    /// Same session and slot always yield the same key
    pub idempotency_key: BookingKey,
    pub timeout_ms: u64,
}

impl BookingRequest {
    pub fn for_slot(
        session_id: SessionId,
        request: &SchedulingRequest,
        slot: TimeSlot,
        timeout: Duration,
    ) -> Self {
        Self {
            session_id,
            slot,
            title: request.title().to_string(),
            description: request.description().map(str::to_string),
            attendees: request.participants().to_vec(),
            idempotency_key: BookingKey::derive(session_id, &slot),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Outcome of one booking call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingResult {
    Confirmed { event_id: EventId },
    /// The slot was rejected; never retry the same slot
    Conflict { reason: String },
    /// Backend unreachable or the call timed out
    Unavailable { reason: String },
}

impl BookingResult {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "CONFIRMED",
            Self::Conflict { .. } => "CONFLICT",
            Self::Unavailable { .. } => "UNAVAILABLE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingResponse {
    pub session_id: SessionId,
    pub slot: TimeSlot,
    pub idempotency_key: BookingKey,
    pub result: BookingResult,
}

/// Every message that crosses an agent boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum AgentMessage {
    AvailabilityRequest(AvailabilityRequest),
    AvailabilityResponse(AvailabilityResponse),
    BookingRequest(BookingRequest),
    BookingResponse(BookingResponse),
}

impl AgentMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AvailabilityRequest(_) => "availability_request",
            Self::AvailabilityResponse(_) => "availability_response",
            Self::BookingRequest(_) => "booking_request",
            Self::BookingResponse(_) => "booking_response",
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            Self::AvailabilityRequest(m) => m.session_id,
            Self::AvailabilityResponse(m) => m.session_id,
            Self::BookingRequest(m) => m.session_id,
            Self::BookingResponse(m) => m.session_id,
        }
    }

    pub fn hop(&self) -> Hop {
        match self {
            Self::AvailabilityRequest(_) | Self::AvailabilityResponse(_) => Hop::Availability,
            Self::BookingRequest(_) | Self::BookingResponse(_) => Hop::Booking,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Self::AvailabilityRequest(_) | Self::BookingRequest(_))
    }

    /// Short human-readable summary for logs
    pub fn summary(&self) -> String {
        match self {
            Self::AvailabilityRequest(m) => {
                format!("{} participants over {}", m.participants.len(), m.window)
            }
            Self::AvailabilityResponse(m) => format!("{} records", m.records.len()),
            Self::BookingRequest(m) => format!("slot {} key {}", m.slot, m.idempotency_key),
            Self::BookingResponse(m) => format!("slot {} -> {}", m.slot, m.result.label()),
        }
    }
}
