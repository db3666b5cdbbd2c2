//! # Structured Logging Module
//!
//! Environment-aware structured logging for negotiation sessions. Human-readable
//! console output in development and test, JSON lines in production.

use crate::constants::{events, system::ENV_PREFIX};
use crate::orchestration::policy::Hop;
use crate::models::SessionId;
use crate::state_machine::SessionTransition;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let console = if use_json_output(&environment) {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed()
        };

        // A host process may already own the global subscriber
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var(format!("{ENV_PREFIX}_ENV"))
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn use_json_output(environment: &str) -> bool {
    match std::env::var(format!("{ENV_PREFIX}_LOG_FORMAT")) {
        Ok(format) => format.eq_ignore_ascii_case("json"),
        Err(_) => environment == "production",
    }
}

/// Log a recorded session state transition
pub fn log_session_transition(transition: &SessionTransition) {
    tracing::info!(
        session_id = %transition.session_id,
        sort_key = transition.sort_key,
        from_state = %transition.from_state,
        to_state = %transition.to_state,
        event = events::SESSION_TRANSITIONED,
        event_type = transition.event.event_type(),
        cause = %transition.cause,
        timestamp = %transition.transitioned_at.to_rfc3339(),
        "🔄 SESSION_TRANSITION"
    );
}

/// Log one collaborator call made on behalf of a session
pub fn log_hop_attempt(
    session_id: SessionId,
    hop: Hop,
    attempt: u32,
    max_attempts: u32,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        session_id = %session_id,
        hop = %hop,
        attempt = attempt,
        max_attempts = max_attempts,
        status = %status,
        details = details,
        event = events::HOP_ATTEMPT,
        timestamp = %Utc::now().to_rfc3339(),
        "📡 HOP_ATTEMPT"
    );
}

/// Log an inter-agent message crossing the orchestrator boundary
pub fn log_agent_message(session_id: SessionId, kind: &str, direction: &str, details: Option<&str>) {
    tracing::debug!(
        session_id = %session_id,
        kind = %kind,
        direction = %direction,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "✉️ AGENT_MESSAGE"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_error("test", "noop", "nothing happened", None);
    }
}
