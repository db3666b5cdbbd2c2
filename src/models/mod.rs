//! # Data Model
//!
//! Requests, slots, availability records, ranked candidates and sessions.

pub mod availability;
pub mod candidate;
pub mod identifiers;
pub mod request;
pub mod session;
pub mod time_slot;

pub use availability::{AvailabilityMap, AvailabilityRecord, AvailabilityStatus};
pub use candidate::{CandidateScore, CandidateSlot};
pub use identifiers::{BookingKey, EventId, ParticipantId, SessionId};
pub use request::{PreferredDay, SchedulingRequest, SchedulingRequestPayload};
pub use session::{
    AttemptResult, BookingAttempt, BookingConfirmation, FailureDetail, Session, SessionResponse,
};
pub use time_slot::TimeSlot;
