//! # Hop Error Classification
//!
//! Maps errors raised during a hop to a handling decision: retry after a delay,
//! advance to the next candidate, or stop.
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ AgendaError     │────▶│ ErrorClassifier │────▶│ Classification  │
//! │ + ErrorContext  │     │ + policy table  │     │ (retry? delay?) │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```

use crate::error::AgendaError;
use crate::models::SessionId;
use crate::orchestration::policy::{Hop, HopPolicyTable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Context information for error classification
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub session_id: SessionId,
    pub hop: Hop,
    /// Current attempt number (1-based)
    pub attempt_number: u32,
    /// Maximum allowed attempts for this hop
    pub max_attempts: u32,
    /// Remaining session time budget
    pub remaining_budget: Duration,
}

/// Primary error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed input; never retried
    Validation,
    /// Backend temporarily unreachable; retried with backoff
    Transient,
    /// Specific slot rejected; advance, never retry the same slot
    Conflict,
    /// Nothing to book; a normal outcome
    NoSlot,
    /// Requires operator intervention
    Configuration,
    /// Session bookkeeping went wrong
    StateInconsistency,
    /// Session ended by caller or by its time budget
    Terminated,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "Validation"),
            ErrorCategory::Transient => write!(f, "Transient"),
            ErrorCategory::Conflict => write!(f, "Conflict"),
            ErrorCategory::NoSlot => write!(f, "No Slot"),
            ErrorCategory::Configuration => write!(f, "Configuration"),
            ErrorCategory::StateInconsistency => write!(f, "State Inconsistency"),
            ErrorCategory::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Result of error classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub error_category: ErrorCategory,
    pub is_retryable: bool,
    /// Delay before the next attempt, when retryable
    pub retry_delay: Option<Duration>,
    pub error_code: String,
    pub error_message: String,
    pub is_final_attempt: bool,
}

/// Trait for error classification strategies
pub trait ErrorClassifier: Send + Sync {
    /// Classify an error and provide handling recommendations
    fn classify_error(&self, error: &AgendaError, context: &ErrorContext) -> ErrorClassification;

    /// Get the classifier name for identification
    fn classifier_name(&self) -> &'static str;
}

/// Classifier backed by the hop policy table
#[derive(Debug, Clone)]
pub struct StandardErrorClassifier {
    policies: HopPolicyTable,
}

impl StandardErrorClassifier {
    pub fn new(policies: HopPolicyTable) -> Self {
        Self { policies }
    }

    fn classify_transient(
        &self,
        error: &AgendaError,
        context: &ErrorContext,
    ) -> ErrorClassification {
        let is_final_attempt = context.attempt_number >= context.max_attempts;
        let policy = self.policies.for_hop(context.hop);
        let delay = policy.backoff.delay_for_attempt(context.attempt_number);
        // The retried call must be able to time out before the session does,
        // otherwise the hop fallback never gets a chance to run
        let fits_budget = delay + policy.timeout() < context.remaining_budget;
        let is_retryable = !is_final_attempt && fits_budget;

        ErrorClassification {
            error_category: ErrorCategory::Transient,
            is_retryable,
            retry_delay: is_retryable.then_some(delay),
            error_code: error.error_code().to_string(),
            error_message: format!(
                "{} hop attempt {}/{} for session {}: {}",
                context.hop, context.attempt_number, context.max_attempts, context.session_id, error
            ),
            is_final_attempt: is_final_attempt || !fits_budget,
        }
    }

    fn terminal(
        category: ErrorCategory,
        error: &AgendaError,
        context: &ErrorContext,
    ) -> ErrorClassification {
        ErrorClassification {
            error_category: category,
            is_retryable: false,
            retry_delay: None,
            error_code: error.error_code().to_string(),
            error_message: format!("{} hop for session {}: {}", context.hop, context.session_id, error),
            is_final_attempt: true,
        }
    }
}

impl ErrorClassifier for StandardErrorClassifier {
    fn classify_error(&self, error: &AgendaError, context: &ErrorContext) -> ErrorClassification {
        match error {
            AgendaError::TransientBackend { .. } => self.classify_transient(error, context),
            AgendaError::Conflict { .. } => Self::terminal(ErrorCategory::Conflict, error, context),
            AgendaError::NoSlot => Self::terminal(ErrorCategory::NoSlot, error, context),
            AgendaError::Validation(_) => Self::terminal(ErrorCategory::Validation, error, context),
            AgendaError::Configuration(_) => {
                Self::terminal(ErrorCategory::Configuration, error, context)
            }
            AgendaError::StateTransition(_) | AgendaError::SessionNotFound(_) => {
                Self::terminal(ErrorCategory::StateInconsistency, error, context)
            }
            AgendaError::Cancelled(_) | AgendaError::SessionTimeout(_) => {
                Self::terminal(ErrorCategory::Terminated, error, context)
            }
        }
    }

    fn classifier_name(&self) -> &'static str {
        "standard"
    }
}
