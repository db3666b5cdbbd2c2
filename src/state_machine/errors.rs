use thiserror::Error;

/// Error types for session state machine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Guard condition failed: {reason}")]
    GuardFailed { reason: String },

    #[error("Invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Session already terminal in state {state}")]
    AlreadyTerminal { state: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
