use crate::models::{EventId, TimeSlot};
use crate::orchestration::policy::Hop;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hop in flight when a session-level failure struck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopProgress {
    pub hop: Hop,
    /// Calls made on the hop so far (per candidate for booking)
    pub attempts: u32,
}

impl fmt::Display for HopProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hop attempt {}", self.hop, self.attempts)
    }
}

/// Why a session ended in `FAILED`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    /// Request passed payload validation but violates session limits
    InvalidInput { reason: String },
    /// A hop kept failing transiently until its retry budget ran out
    RetryBudgetExhausted {
        hop: Hop,
        attempts: u32,
        reason: String,
    },
    /// Too many collaborator calls across the whole session
    AttemptBudgetExceeded { attempts: u32 },
    /// Wall-clock ceiling for the session was hit mid-flight
    SessionTimeout {
        elapsed_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        during: Option<HopProgress>,
    },
    /// The caller cancelled the session
    Cancelled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        during: Option<HopProgress>,
    },
    /// Session bookkeeping broke; the session is closed rather than left dangling
    Internal { reason: String },
}

impl FailureCause {
    pub fn hop(&self) -> Option<Hop> {
        match self {
            Self::RetryBudgetExhausted { hop, .. } => Some(*hop),
            Self::SessionTimeout { during, .. } | Self::Cancelled { during } => {
                during.map(|progress| progress.hop)
            }
            _ => None,
        }
    }

    /// Attempt count behind the failure, when one applies
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetryBudgetExhausted { attempts, .. } | Self::AttemptBudgetExceeded { attempts } => {
                Some(*attempts)
            }
            Self::SessionTimeout { during, .. } | Self::Cancelled { during } => {
                during.map(|progress| progress.attempts)
            }
            _ => None,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::RetryBudgetExhausted { .. } => "RETRY_BUDGET_EXHAUSTED",
            Self::AttemptBudgetExceeded { .. } => "ATTEMPT_BUDGET_EXCEEDED",
            Self::SessionTimeout { .. } => "SESSION_TIMEOUT",
            Self::Cancelled { .. } => "SESSION_CANCELLED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { reason } => write!(f, "invalid input: {reason}"),
            Self::RetryBudgetExhausted {
                hop,
                attempts,
                reason,
            } => write!(f, "{hop} hop failed after {attempts} attempts: {reason}"),
            Self::AttemptBudgetExceeded { attempts } => {
                write!(f, "session attempt budget exceeded after {attempts} calls")
            }
            Self::SessionTimeout { elapsed_ms, during } => {
                write!(f, "session timed out after {elapsed_ms}ms")?;
                match during {
                    Some(progress) => write!(f, " during {progress}"),
                    None => Ok(()),
                }
            }
            Self::Cancelled { during } => {
                write!(f, "cancelled by caller")?;
                match during {
                    Some(progress) => write!(f, " during {progress}"),
                    None => Ok(()),
                }
            }
            Self::Internal { reason } => write!(f, "internal error: {reason}"),
        }
    }
}

/// Events that drive session state transitions.
///
/// Each event doubles as the recorded cause of the transition it triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Request accepted against session limits
    Validated,
    /// Resolver failed as a whole; another attempt is scheduled
    ResolverRetry { attempt: u32, reason: String },
    /// Resolver answered (possibly with unknown participants)
    AvailabilityResolved {
        known: usize,
        uncertain: usize,
        degraded: bool,
    },
    /// Ranked candidate list is non-empty
    CandidatesRanked { count: usize },
    /// Ranked candidate list is empty
    NoCandidates { alternatives: usize },
    /// Calendar rejected this specific slot
    BookingConflict { slot: TimeSlot, reason: String },
    /// Calendar unreachable for this slot; retrying the same slot
    BookingRetry {
        slot: TimeSlot,
        attempt: u32,
        reason: String,
    },
    /// Calendar accepted the slot
    BookingConfirmed { slot: TimeSlot, event_id: EventId },
    /// Calendar unreachable; booking synthesized locally
    MockBookingConfirmed { slot: TimeSlot, event_id: EventId },
    /// Every candidate conflicted
    CandidatesExhausted { attempted: usize },
    /// Terminal failure
    Fail(FailureCause),
}

impl SessionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::ResolverRetry { .. } => "resolver_retry",
            Self::AvailabilityResolved { .. } => "availability_resolved",
            Self::CandidatesRanked { .. } => "candidates_ranked",
            Self::NoCandidates { .. } => "no_candidates",
            Self::BookingConflict { .. } => "booking_conflict",
            Self::BookingRetry { .. } => "booking_retry",
            Self::BookingConfirmed { .. } => "booking_confirmed",
            Self::MockBookingConfirmed { .. } => "mock_booking_confirmed",
            Self::CandidatesExhausted { .. } => "candidates_exhausted",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract the failure cause if this is a failure event
    pub fn failure_cause(&self) -> Option<&FailureCause> {
        match self {
            Self::Fail(cause) => Some(cause),
            _ => None,
        }
    }

    /// Human readable cause for audit trails
    pub fn describe(&self) -> String {
        match self {
            Self::Validated => "request accepted".to_string(),
            Self::ResolverRetry { attempt, reason } => {
                format!("availability attempt {attempt} failed: {reason}")
            }
            Self::AvailabilityResolved {
                known,
                uncertain,
                degraded,
            } => {
                if *degraded {
                    format!("availability unavailable, proceeding with {uncertain} unknown participants")
                } else {
                    format!("availability resolved: {known} known, {uncertain} uncertain")
                }
            }
            Self::CandidatesRanked { count } => format!("{count} candidates ranked"),
            Self::NoCandidates { alternatives } => {
                format!("no eligible candidate ({alternatives} alternatives suggested)")
            }
            Self::BookingConflict { slot, reason } => format!("conflict on {slot}: {reason}"),
            Self::BookingRetry {
                slot,
                attempt,
                reason,
            } => format!("booking attempt {attempt} for {slot} failed: {reason}"),
            Self::BookingConfirmed { slot, event_id } => {
                format!("booked {slot} as {event_id}")
            }
            Self::MockBookingConfirmed { slot, event_id } => {
                format!("calendar unreachable, mock booked {slot} as {event_id}")
            }
            Self::CandidatesExhausted { attempted } => {
                format!("all {attempted} candidates conflicted")
            }
            Self::Fail(cause) => cause.to_string(),
        }
    }
}
