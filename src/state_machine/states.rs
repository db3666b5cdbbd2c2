use serde::{Deserialize, Serialize};
use std::fmt;

/// Negotiation session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Session created, request not yet checked against session limits
    Created,
    /// Waiting on the availability resolver
    Resolving,
    /// Ranking candidate slots
    Selecting,
    /// Committing a candidate through the booking coordinator
    Booking,
    /// External calendar accepted the booking
    Confirmed,
    /// Calendar unreachable; booking synthesized locally and not persisted
    ConfirmedMock,
    /// No eligible candidate, or every candidate conflicted
    NoSlotAvailable,
    /// Budget exceeded, cancelled, or unrecoverable input
    Failed,
}

impl SessionState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::ConfirmedMock | Self::NoSlotAvailable | Self::Failed
        )
    }

    /// Check if the session is waiting on a collaborator
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Resolving | Self::Selecting | Self::Booking)
    }

    /// Check if this outcome carries a committed slot
    pub fn is_booked(&self) -> bool {
        matches!(self, Self::Confirmed | Self::ConfirmedMock)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Resolving => write!(f, "RESOLVING"),
            Self::Selecting => write!(f, "SELECTING"),
            Self::Booking => write!(f, "BOOKING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::ConfirmedMock => write!(f, "CONFIRMED_MOCK"),
            Self::NoSlotAvailable => write!(f, "NO_SLOT_AVAILABLE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "RESOLVING" => Ok(Self::Resolving),
            "SELECTING" => Ok(Self::Selecting),
            "BOOKING" => Ok(Self::Booking),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CONFIRMED_MOCK" => Ok(Self::ConfirmedMock),
            "NO_SLOT_AVAILABLE" => Ok(Self::NoSlotAvailable),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid session state: {s}")),
        }
    }
}

/// Default state for new sessions
impl Default for SessionState {
    fn default() -> Self {
        Self::Created
    }
}
