//! # System Constants
//!
//! Event names, defaults and status groupings that define the operational
//! boundaries of the negotiation core.

pub use crate::state_machine::SessionState;

/// Session lifecycle event names used in structured logs
pub mod events {
    pub const SESSION_CREATED: &str = "session.created";
    pub const SESSION_TRANSITIONED: &str = "session.transitioned";
    pub const SESSION_DELIVERED: &str = "session.delivered";
    pub const SESSION_CANCEL_REQUESTED: &str = "session.cancel_requested";

    pub const HOP_ATTEMPT: &str = "hop.attempt";
    pub const HOP_RETRY_SCHEDULED: &str = "hop.retry_scheduled";
    pub const HOP_EXHAUSTED: &str = "hop.exhausted";

    pub const BOOKING_FALLBACK: &str = "booking.fallback";
}

/// System-wide identifiers and limits
pub mod system {
    pub const AGENDA_CORE_VERSION: &str = "0.1.0";

    /// Prefix for locally synthesized, non-authoritative event identifiers
    pub const MOCK_EVENT_PREFIX: &str = "mock_meeting_";

    /// Environment variable prefix for configuration overrides
    pub const ENV_PREFIX: &str = "AGENDA";

    pub const DEFAULT_TIMEZONE: &str = "UTC";
}

/// Default values for configuration parameters the source system never fixed
pub mod defaults {
    pub const HORIZON_DAYS: u32 = 7;
    pub const ALTERNATIVE_RADIUS_MINUTES: u32 = 120;
    pub const ALTERNATIVE_STEP_MINUTES: u32 = 30;
    pub const MAX_ALTERNATIVES: usize = 5;
    pub const MAX_DURATION_MINUTES: u32 = 8 * 60;
    pub const MAX_PARTICIPANTS: usize = 100;

    pub const SESSION_TIMEOUT_MS: u64 = 30_000;
    pub const SESSION_MAX_TOTAL_ATTEMPTS: u32 = 20;

    pub const AVAILABILITY_MAX_RETRIES: u32 = 3;
    pub const AVAILABILITY_TIMEOUT_MS: u64 = 5_000;
    pub const AVAILABILITY_INITIAL_BACKOFF_MS: u64 = 200;

    pub const BOOKING_MAX_RETRIES: u32 = 2;
    pub const BOOKING_TIMEOUT_MS: u64 = 10_000;
    pub const BOOKING_INITIAL_BACKOFF_MS: u64 = 500;

    pub const BACKOFF_MULTIPLIER: f64 = 2.0;
    pub const MAX_BACKOFF_MS: u64 = 5_000;
}

/// Groupings of session states for orchestration decisions
pub mod status_groups {
    use super::SessionState;

    /// Terminal outcomes; a session in one of these never transitions again
    pub const SESSION_TERMINAL_STATES: &[SessionState] = &[
        SessionState::Confirmed,
        SessionState::ConfirmedMock,
        SessionState::NoSlotAvailable,
        SessionState::Failed,
    ];

    /// States in which the session is waiting on a collaborator
    pub const SESSION_ACTIVE_STATES: &[SessionState] = &[
        SessionState::Resolving,
        SessionState::Selecting,
        SessionState::Booking,
    ];

    /// Outcomes that carry a committed slot
    pub const SESSION_BOOKED_STATES: &[SessionState] =
        &[SessionState::Confirmed, SessionState::ConfirmedMock];
}
