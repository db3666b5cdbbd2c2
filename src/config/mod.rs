//! # Agenda Configuration System
//!
//! Configuration for the negotiation core: scheduling horizon and limits,
//! session budgets, and the per-hop retry/timeout/fallback policy table.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use agenda_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (environment auto-detected)
//! let manager = ConfigManager::load()?;
//!
//! let horizon = manager.config().scheduling.horizon_days;
//! let booking_retries = manager.config().policies.booking.max_retries;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::defaults;
use crate::orchestration::policy::HopPolicyTable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/agenda.toml`
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AgendaConfig {
    /// Candidate enumeration and request limits
    pub scheduling: SchedulingConfig,

    /// Whole-session budgets
    pub session: SessionConfig,

    /// Per-hop retry, timeout and fallback rules
    pub policies: HopPolicyTable,
}

/// Candidate enumeration and request limits
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Slots starting more than this many days from now are never proposed
    pub horizon_days: u32,
    /// How far around a preferred slot alternatives are searched
    pub alternative_radius_minutes: u32,
    /// Granularity of the alternative search
    pub alternative_step_minutes: u32,
    pub max_alternatives: usize,
    pub max_duration_minutes: u32,
    pub max_participants: usize,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            horizon_days: defaults::HORIZON_DAYS,
            alternative_radius_minutes: defaults::ALTERNATIVE_RADIUS_MINUTES,
            alternative_step_minutes: defaults::ALTERNATIVE_STEP_MINUTES,
            max_alternatives: defaults::MAX_ALTERNATIVES,
            max_duration_minutes: defaults::MAX_DURATION_MINUTES,
            max_participants: defaults::MAX_PARTICIPANTS,
        }
    }
}

/// Whole-session budgets
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wall-clock ceiling for one session
    pub timeout_ms: u64,
    /// Collaborator calls allowed across all hops of one session
    pub max_total_attempts: u32,
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::SESSION_TIMEOUT_MS,
            max_total_attempts: defaults::SESSION_MAX_TOTAL_ATTEMPTS,
        }
    }
}

impl AgendaConfig {
    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.scheduling.horizon_days == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduling.horizon_days",
                "0",
                "horizon must cover at least one day",
            ));
        }

        if self.scheduling.alternative_step_minutes == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduling.alternative_step_minutes",
                "0",
                "step must be greater than 0",
            ));
        }

        if self.scheduling.max_duration_minutes == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduling.max_duration_minutes",
                "0",
                "maximum duration must be greater than 0",
            ));
        }

        if self.scheduling.max_participants == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduling.max_participants",
                "0",
                "at least one participant must be allowed",
            ));
        }

        if self.session.timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "session.timeout_ms",
                "0",
                "session timeout must be greater than 0",
            ));
        }

        if self.session.max_total_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "session.max_total_attempts",
                "0",
                "at least one collaborator call must be allowed",
            ));
        }

        self.policies
            .validate()
            .map_err(|reason| ConfigurationError::invalid_value("policies", "", reason))
    }
}
