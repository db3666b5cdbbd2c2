#![allow(dead_code)] // Each test binary uses a different subset of the fixtures

pub mod builders;
pub mod strategies;

pub use builders::*;

use agenda_core::calendar::InMemoryCalendar;
use agenda_core::config::AgendaConfig;
use agenda_core::models::TimeSlot;
use agenda_core::orchestration::NegotiationOrchestrator;
use agenda_core::selection::FixedClock;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Once};

static INIT_LOGGING: Once = Once::new();

/// Install a test-friendly subscriber once per test binary
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Sunday 2026-10-18 12:00 UTC. The default 7-day horizon holds exactly one
/// Monday (2026-10-19).
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(fixed_now()))
}

/// Instant on Monday 2026-10-19, UTC
pub fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, hour, minute, 0).unwrap()
}

/// Slot on Monday 2026-10-19 starting at `hour:minute` UTC
pub fn monday_slot(hour: u32, minute: u32, minutes: i64) -> TimeSlot {
    let start = monday_at(hour, minute);
    TimeSlot::new(start, start + Duration::minutes(minutes)).unwrap()
}

/// Defaults with short hop timeouts and backoffs
pub fn test_config() -> AgendaConfig {
    let mut config = AgendaConfig::default();
    config.session.timeout_ms = 5_000;
    for policy in [&mut config.policies.availability, &mut config.policies.booking] {
        policy.timeout_ms = 500;
        policy.backoff.initial_delay_ms = 10;
        policy.backoff.max_delay_ms = 100;
    }
    config
}

pub fn orchestrator(calendar: &Arc<InMemoryCalendar>) -> NegotiationOrchestrator {
    orchestrator_with(test_config(), calendar)
}

pub fn orchestrator_with(
    config: AgendaConfig,
    calendar: &Arc<InMemoryCalendar>,
) -> NegotiationOrchestrator {
    init_test_logging();
    NegotiationOrchestrator::new(config, calendar.clone(), fixed_clock())
        .expect("test configuration should be valid")
}
