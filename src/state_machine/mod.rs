// Session state machine for negotiation orchestration
//
// A session moves CREATED -> RESOLVING -> SELECTING -> BOOKING and ends in one
// of CONFIRMED, CONFIRMED_MOCK, NO_SLOT_AVAILABLE or FAILED. Every transition
// is recorded in an in-memory audit trail and logged.

pub mod errors;
pub mod events;
pub mod persistence;
pub mod session_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::{FailureCause, HopProgress, SessionEvent};
pub use persistence::{SessionTransition, TransitionLog};
pub use session_state_machine::SessionStateMachine;
pub use states::SessionState;
