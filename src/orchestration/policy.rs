//! # Hop Policy Table
//!
//! Retry, backoff, timeout and fallback rules for each inter-agent hop, kept in
//! one table that the orchestrator consults uniformly instead of per call site.

use crate::constants::defaults;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One class of inter-agent call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hop {
    /// Host -> Scheduler/Calendar busy-time queries
    Availability,
    /// Host -> Calendar event creation
    Booking,
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Availability => write!(f, "availability"),
            Self::Booking => write!(f, "booking"),
        }
    }
}

/// What to do once a hop's retries are exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackAction {
    /// End the session in `FAILED`
    Fail,
    /// Availability only: continue with every participant `UNKNOWN`
    Degrade,
    /// Booking only: synthesize a local, non-authoritative booking
    MockBooking,
}

/// Exponential backoff curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based): `initial * multiplier^(attempt-1)`, capped
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let delay_ms = (self.initial_delay_ms as f64) * self.multiplier.powi(exponent);
        let capped = if delay_ms.is_finite() {
            delay_ms.min(self.max_delay_ms as f64)
        } else {
            self.max_delay_ms as f64
        };
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

/// Rules for one hop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Per-call timeout (per participant for availability)
    pub timeout_ms: u64,
    pub backoff: BackoffPolicy,
    pub fallback: FallbackAction,
}

impl HopPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Total calls allowed for one unit of work on this hop
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Policy for every hop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopPolicyTable {
    pub availability: HopPolicy,
    pub booking: HopPolicy,
}

impl HopPolicyTable {
    pub fn for_hop(&self, hop: Hop) -> &HopPolicy {
        match hop {
            Hop::Availability => &self.availability,
            Hop::Booking => &self.booking,
        }
    }

    /// Fallback actions that make sense for each hop
    pub fn validate(&self) -> Result<(), String> {
        for hop in [Hop::Availability, Hop::Booking] {
            let policy = self.for_hop(hop);
            if policy.timeout_ms == 0 {
                return Err(format!("{hop} timeout_ms must be positive"));
            }
            if policy.backoff.multiplier < 1.0 {
                return Err(format!("{hop} backoff multiplier must be >= 1.0"));
            }
            if policy.backoff.max_delay_ms < policy.backoff.initial_delay_ms {
                return Err(format!(
                    "{hop} backoff max_delay_ms must be >= initial_delay_ms"
                ));
            }
        }
        if self.availability.fallback == FallbackAction::MockBooking {
            return Err("availability fallback cannot be mock_booking".to_string());
        }
        if self.booking.fallback == FallbackAction::Degrade {
            return Err("booking fallback cannot be degrade".to_string());
        }
        Ok(())
    }
}

impl Default for HopPolicyTable {
    fn default() -> Self {
        Self {
            availability: HopPolicy {
                max_retries: defaults::AVAILABILITY_MAX_RETRIES,
                timeout_ms: defaults::AVAILABILITY_TIMEOUT_MS,
                backoff: BackoffPolicy {
                    initial_delay_ms: defaults::AVAILABILITY_INITIAL_BACKOFF_MS,
                    multiplier: defaults::BACKOFF_MULTIPLIER,
                    max_delay_ms: defaults::MAX_BACKOFF_MS,
                },
                fallback: FallbackAction::Fail,
            },
            booking: HopPolicy {
                max_retries: defaults::BOOKING_MAX_RETRIES,
                timeout_ms: defaults::BOOKING_TIMEOUT_MS,
                backoff: BackoffPolicy {
                    initial_delay_ms: defaults::BOOKING_INITIAL_BACKOFF_MS,
                    multiplier: defaults::BACKOFF_MULTIPLIER,
                    max_delay_ms: defaults::MAX_BACKOFF_MS,
                },
                fallback: FallbackAction::MockBooking,
            },
        }
    }
}
