use crate::models::{SessionId, TimeSlot};
use crate::orchestration::policy::Hop;
use thiserror::Error;

/// Top-level error type for the negotiation core.
///
/// Variants line up with the error taxonomy the orchestrator reasons about:
/// validation failures never enter the state machine, transient backend
/// failures are retried per hop policy, conflicts advance the candidate list
/// and `NoSlot` is an ordinary terminal outcome rather than a system fault.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgendaError {
    #[error("Validation error: {0}")]
    Validation(#[from] crate::validation::ValidationError),

    #[error("Transient backend error on {hop} hop: {reason}")]
    TransientBackend { hop: Hop, reason: String },

    #[error("Calendar rejected slot {slot}")]
    Conflict { slot: TimeSlot },

    #[error("No slot available")]
    NoSlot,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("State transition error: {0}")]
    StateTransition(String),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Session {0} was cancelled")]
    Cancelled(SessionId),

    #[error("Session {0} exceeded its time budget")]
    SessionTimeout(SessionId),
}

impl AgendaError {
    /// Stable machine-readable code, used in failure details and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::TransientBackend { .. } => "TRANSIENT_BACKEND_ERROR",
            Self::Conflict { .. } => "BOOKING_CONFLICT",
            Self::NoSlot => "NO_SLOT_AVAILABLE",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::StateTransition(_) => "STATE_TRANSITION_ERROR",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::Cancelled(_) => "SESSION_CANCELLED",
            Self::SessionTimeout(_) => "SESSION_TIMEOUT",
        }
    }
}

impl From<crate::state_machine::StateMachineError> for AgendaError {
    fn from(err: crate::state_machine::StateMachineError) -> Self {
        Self::StateTransition(err.to_string())
    }
}

impl From<crate::resolver::ResolverError> for AgendaError {
    fn from(err: crate::resolver::ResolverError) -> Self {
        Self::TransientBackend {
            hop: Hop::Availability,
            reason: err.to_string(),
        }
    }
}

impl From<crate::config::ConfigurationError> for AgendaError {
    fn from(err: crate::config::ConfigurationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgendaError>;
