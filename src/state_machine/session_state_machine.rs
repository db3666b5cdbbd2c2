use super::{
    errors::{StateMachineError, StateMachineResult},
    events::SessionEvent,
    persistence::{SessionTransition, TransitionLog},
    states::SessionState,
};
use crate::logging::log_session_transition;
use crate::models::SessionId;

/// Lifecycle state machine for one negotiation session
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    session_id: SessionId,
    current: SessionState,
    persistence: TransitionLog,
}

impl SessionStateMachine {
    /// Create a new session state machine in `CREATED`
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            current: SessionState::default(),
            persistence: TransitionLog::new(),
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.current
    }

    /// Attempt to transition the session state
    pub fn transition(&mut self, event: SessionEvent) -> StateMachineResult<SessionState> {
        let current_state = self.current;
        if current_state.is_terminal() {
            return Err(StateMachineError::AlreadyTerminal {
                state: current_state.to_string(),
            });
        }

        let target_state = Self::determine_target_state(current_state, &event)?;
        Self::check_guards(current_state, target_state, &event)?;

        let transition = self.persistence.persist_transition(
            self.session_id,
            current_state,
            target_state,
            event,
        );
        log_session_transition(transition);

        self.current = target_state;
        Ok(target_state)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: SessionState,
        event: &SessionEvent,
    ) -> StateMachineResult<SessionState> {
        let target = match (current_state, event) {
            (SessionState::Created, SessionEvent::Validated) => SessionState::Resolving,

            (SessionState::Resolving, SessionEvent::ResolverRetry { .. }) => {
                SessionState::Resolving
            }
            (SessionState::Resolving, SessionEvent::AvailabilityResolved { .. }) => {
                SessionState::Selecting
            }

            (SessionState::Selecting, SessionEvent::CandidatesRanked { .. }) => {
                SessionState::Booking
            }
            (SessionState::Selecting, SessionEvent::NoCandidates { .. }) => {
                SessionState::NoSlotAvailable
            }

            (SessionState::Booking, SessionEvent::BookingConflict { .. })
            | (SessionState::Booking, SessionEvent::BookingRetry { .. }) => SessionState::Booking,
            (SessionState::Booking, SessionEvent::BookingConfirmed { .. }) => {
                SessionState::Confirmed
            }
            (SessionState::Booking, SessionEvent::MockBookingConfirmed { .. }) => {
                SessionState::ConfirmedMock
            }
            (SessionState::Booking, SessionEvent::CandidatesExhausted { .. }) => {
                SessionState::NoSlotAvailable
            }

            (from_state, SessionEvent::Fail(_)) if !from_state.is_terminal() => {
                SessionState::Failed
            }

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    /// Check guard conditions for the transition
    fn check_guards(
        current_state: SessionState,
        target_state: SessionState,
        event: &SessionEvent,
    ) -> StateMachineResult<()> {
        match (current_state, target_state, event) {
            // Booking needs something to book
            (SessionState::Selecting, SessionState::Booking, SessionEvent::CandidatesRanked { count })
                if *count == 0 =>
            {
                Err(StateMachineError::GuardFailed {
                    reason: "cannot enter BOOKING with an empty candidate list".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn transitions(&self) -> &[SessionTransition] {
        self.persistence.entries()
    }

    pub fn audit_trail(&self) -> &TransitionLog {
        &self.persistence
    }
}
