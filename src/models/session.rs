use super::{
    AvailabilityMap, AvailabilityStatus, BookingKey, CandidateSlot, EventId, ParticipantId,
    SchedulingRequest, SessionId, TimeSlot,
};
use crate::orchestration::policy::Hop;
use crate::state_machine::{
    FailureCause, SessionEvent, SessionState, SessionStateMachine, SessionTransition,
    StateMachineError, StateMachineResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A committed booking, real or mock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub event_id: EventId,
    pub slot: TimeSlot,
    pub booking_key: BookingKey,
    /// `true` when the calendar was unreachable and nothing was persisted externally
    pub is_mock: bool,
}

/// What happened to one candidate the session tried to book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptResult {
    Confirmed { event_id: EventId },
    ConfirmedMock { event_id: EventId },
    Conflict { reason: String },
    /// Calendar unreachable and no fallback was allowed
    Unavailable { reason: String },
    /// Session ended (cancel/timeout) before this attempt resolved
    Abandoned { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingAttempt {
    pub candidate: CandidateSlot,
    /// Calls made to the calendar for this candidate
    pub calls: u32,
    pub result: AttemptResult,
}

/// Diagnostic detail attached to a `FAILED` outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub error_code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hop: Option<Hop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl From<&FailureCause> for FailureDetail {
    fn from(cause: &FailureCause) -> Self {
        Self {
            error_code: cause.error_code().to_string(),
            message: cause.to_string(),
            hop: cause.hop(),
            attempts: cause.attempts(),
        }
    }
}

/// One end-to-end attempt to satisfy a scheduling request.
///
/// Owned by the orchestrator; every state change goes through the embedded
/// state machine so the audit trail stays complete.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    request: Arc<SchedulingRequest>,
    machine: SessionStateMachine,
    created_at: DateTime<Utc>,
    availability: AvailabilityMap,
    candidates: Vec<CandidateSlot>,
    attempts: Vec<BookingAttempt>,
    confirmation: Option<BookingConfirmation>,
    alternatives: Vec<TimeSlot>,
    failure: Option<FailureDetail>,
    hop_calls: u32,
}

impl Session {
    pub fn new(id: SessionId, request: Arc<SchedulingRequest>) -> Self {
        Self {
            id,
            request,
            machine: SessionStateMachine::new(id),
            created_at: Utc::now(),
            availability: AvailabilityMap::new(),
            candidates: Vec::new(),
            attempts: Vec::new(),
            confirmation: None,
            alternatives: Vec::new(),
            failure: None,
            hop_calls: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn request(&self) -> &Arc<SchedulingRequest> {
        &self.request
    }

    pub fn state(&self) -> SessionState {
        self.machine.current_state()
    }

    pub fn is_terminal(&self) -> bool {
        self.machine.is_terminal()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Apply a lifecycle event; failure events also record their diagnostic detail
    pub fn apply(&mut self, event: SessionEvent) -> StateMachineResult<SessionState> {
        let detail = event.failure_cause().map(FailureDetail::from);
        let state = self.machine.transition(event)?;
        if detail.is_some() {
            self.failure = detail;
        }
        Ok(state)
    }

    /// Commit a booking. A session commits at most once.
    pub fn commit(&mut self, confirmation: BookingConfirmation) -> StateMachineResult<SessionState> {
        if let Some(existing) = &self.confirmation {
            return Err(StateMachineError::AlreadyTerminal {
                state: format!("{} ({})", self.state(), existing.event_id),
            });
        }
        let event = if confirmation.is_mock {
            SessionEvent::MockBookingConfirmed {
                slot: confirmation.slot,
                event_id: confirmation.event_id.clone(),
            }
        } else {
            SessionEvent::BookingConfirmed {
                slot: confirmation.slot,
                event_id: confirmation.event_id.clone(),
            }
        };
        let state = self.machine.transition(event)?;
        self.confirmation = Some(confirmation);
        Ok(state)
    }

    pub fn confirmation(&self) -> Option<&BookingConfirmation> {
        self.confirmation.as_ref()
    }

    pub fn committed_slot(&self) -> Option<TimeSlot> {
        self.confirmation.as_ref().map(|c| c.slot)
    }

    pub fn set_availability(&mut self, availability: AvailabilityMap) {
        self.availability = availability;
    }

    pub fn availability(&self) -> &AvailabilityMap {
        &self.availability
    }

    pub fn set_candidates(&mut self, candidates: Vec<CandidateSlot>) {
        self.candidates = candidates;
    }

    pub fn candidates(&self) -> &[CandidateSlot] {
        &self.candidates
    }

    pub fn set_alternatives(&mut self, alternatives: Vec<TimeSlot>) {
        self.alternatives = alternatives;
    }

    pub fn record_attempt(&mut self, attempt: BookingAttempt) {
        self.attempts.push(attempt);
    }

    /// Candidates already attempted, in attempt order
    pub fn attempts(&self) -> &[BookingAttempt] {
        &self.attempts
    }

    /// Count one collaborator call against the session budget; returns the new total
    pub fn count_hop_call(&mut self) -> u32 {
        self.hop_calls += 1;
        self.hop_calls
    }

    pub fn hop_calls(&self) -> u32 {
        self.hop_calls
    }

    pub fn transitions(&self) -> &[SessionTransition] {
        self.machine.transitions()
    }

    pub fn failure(&self) -> Option<&FailureDetail> {
        self.failure.as_ref()
    }

    /// Build the caller-facing response from the current session state
    pub fn to_response(&self) -> SessionResponse {
        let risk_flags = self
            .availability
            .iter()
            .map(|(participant, record)| (participant.clone(), record.status))
            .collect();

        SessionResponse {
            session_id: self.id,
            title: self.request.title().to_string(),
            outcome: self.state(),
            committed_slot: self.committed_slot(),
            event_id: self.confirmation.as_ref().map(|c| c.event_id.clone()),
            is_mock: self.confirmation.as_ref().is_some_and(|c| c.is_mock),
            candidates_considered: self.candidates.len(),
            attempted_candidates: self.attempts.clone(),
            risk_flags,
            alternatives: self.alternatives.clone(),
            failure: self.failure.clone(),
            audit_trail: self.transitions().to_vec(),
        }
    }
}

/// Final answer delivered to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub title: String,
    pub outcome: SessionState,
    pub committed_slot: Option<TimeSlot>,
    pub event_id: Option<EventId>,
    pub is_mock: bool,
    pub candidates_considered: usize,
    pub attempted_candidates: Vec<BookingAttempt>,
    /// Availability status per participant as resolved for this session
    pub risk_flags: BTreeMap<ParticipantId, AvailabilityStatus>,
    /// Nearby slots that would work, suggested only when nothing could be booked
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<TimeSlot>,
    pub failure: Option<FailureDetail>,
    pub audit_trail: Vec<SessionTransition>,
}

impl SessionResponse {
    pub fn is_booked(&self) -> bool {
        self.outcome.is_booked()
    }

    /// Count audit entries by event type (e.g. `"booking_conflict"`)
    pub fn count_events(&self, event_type: &str) -> usize {
        self.audit_trail
            .iter()
            .filter(|t| t.event.event_type() == event_type)
            .count()
    }
}
