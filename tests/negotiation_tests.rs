//! End-to-end negotiation sessions against the in-memory calendar

mod common;

use agenda_core::booking::BookingCoordinator;
use agenda_core::calendar::InMemoryCalendar;
use agenda_core::config::AgendaConfig;
use agenda_core::error::AgendaError;
use agenda_core::messaging::{BookingRequest, BookingResult};
use agenda_core::models::{AttemptResult, AvailabilityStatus, ParticipantId};
use agenda_core::orchestration::{FallbackAction, Hop};
use agenda_core::state_machine::SessionState;
use agenda_core::validation::ValidationError;
use common::*;
use std::sync::Arc;
use std::time::Duration;

const ALICE: &str = "alice@example.com";
const BOB: &str = "bob@example.com";
const CAROL: &str = "carol@example.com";

#[tokio::test]
async fn test_books_first_free_preferred_slot() {
    let calendar = Arc::new(InMemoryCalendar::new().with_busy(ALICE, monday_slot(9, 0, 60)));
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Confirmed);
    assert_eq!(response.committed_slot, Some(monday_slot(14, 0, 60)));
    assert!(!response.is_mock);
    assert_eq!(response.candidates_considered, 1);
    assert_eq!(response.risk_flags.get(&ParticipantId::new(ALICE)), Some(&AvailabilityStatus::Known));
    assert_eq!(response.risk_flags.get(&ParticipantId::new(BOB)), Some(&AvailabilityStatus::Known));
    assert_eq!(calendar.created_event_count(), 1);
    assert_eq!(response.event_id, Some(calendar.created_events()[0].event_id.clone()));

    let states: Vec<SessionState> = response.audit_trail.iter().map(|t| t.to_state).collect();
    assert_eq!(
        states,
        vec![
            SessionState::Resolving,
            SessionState::Selecting,
            SessionState::Booking,
            SessionState::Confirmed,
        ]
    );
    assert_eq!(orchestrator.active_sessions(), 0);
}

#[tokio::test]
async fn test_preferred_times_are_read_in_request_timezone() {
    // Oct 19 is still CEST (UTC+2): 09:00 Berlin is 07:00 UTC
    let calendar = Arc::new(InMemoryCalendar::new().with_busy(ALICE, monday_slot(7, 0, 60)));
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().with_timezone("Europe/Berlin").build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Confirmed);
    assert_eq!(response.committed_slot, Some(monday_slot(12, 0, 60)));
}

#[tokio::test]
async fn test_no_slot_reports_alternatives() {
    let calendar = Arc::new(
        InMemoryCalendar::new()
            .with_busy(ALICE, monday_slot(9, 0, 60))
            .with_busy(BOB, monday_slot(14, 0, 60)),
    );
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::NoSlotAvailable);
    assert!(response.committed_slot.is_none());
    assert_eq!(response.candidates_considered, 0);
    assert_eq!(response.count_events("no_candidates"), 1);
    assert_eq!(calendar.create_calls(), 0);

    assert!(!response.alternatives.is_empty());
    assert!(response.alternatives.len() <= orchestrator.config().scheduling.max_alternatives);
    assert_eq!(response.alternatives[0], monday_slot(7, 0, 60));
    for alternative in &response.alternatives {
        assert!(!alternative.overlaps(&monday_slot(9, 0, 60)));
        assert!(!alternative.overlaps(&monday_slot(14, 0, 60)));
    }
}

#[tokio::test]
async fn test_conflict_advances_to_next_candidate() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.force_conflict(monday_slot(9, 0, 60));
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Confirmed);
    assert_eq!(response.committed_slot, Some(monday_slot(14, 0, 60)));
    assert_eq!(response.count_events("booking_conflict"), 1);
    assert_eq!(response.count_events("booking_confirmed"), 1);
    assert_eq!(response.attempted_candidates.len(), 2);
    assert!(matches!(
        response.attempted_candidates[0].result,
        AttemptResult::Conflict { .. }
    ));
    assert_eq!(calendar.created_event_count(), 1);
}

#[tokio::test]
async fn test_every_candidate_conflicting_ends_without_slot() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.force_conflict(monday_slot(9, 0, 60));
    calendar.force_conflict(monday_slot(14, 0, 60));
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::NoSlotAvailable);
    assert_eq!(response.count_events("booking_conflict"), 2);
    assert_eq!(response.count_events("candidates_exhausted"), 1);
    assert_eq!(response.attempted_candidates.len(), 2);
    assert!(response.failure.is_none());
    assert_eq!(calendar.created_event_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_booking_falls_back_to_mock() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_bookings_offline(true);
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::ConfirmedMock);
    assert!(response.is_mock);
    assert_eq!(response.committed_slot, Some(monday_slot(9, 0, 60)));
    let event_id = response.event_id.clone().unwrap();
    assert!(event_id.as_str().starts_with("mock_meeting_"));

    // max_retries = 2 means three calls on the same slot
    assert_eq!(calendar.create_calls(), 3);
    assert_eq!(response.count_events("booking_retry"), 2);
    assert_eq!(response.count_events("mock_booking_confirmed"), 1);
    assert_eq!(calendar.created_event_count(), 0);
    assert!(matches!(
        response.attempted_candidates[0].result,
        AttemptResult::ConfirmedMock { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_booking_fails_when_mock_disallowed() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_bookings_offline(true);
    let mut config = test_config();
    config.policies.booking.fallback = FallbackAction::Fail;
    let orchestrator = orchestrator_with(config, &calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Failed);
    assert!(response.committed_slot.is_none());
    let failure = response.failure.unwrap();
    assert_eq!(failure.error_code, "RETRY_BUDGET_EXHAUSTED");
    assert_eq!(failure.hop, Some(Hop::Booking));
    assert_eq!(failure.attempts, Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_transient_booking_outage_is_retried() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.fail_next_bookings(1);
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Confirmed);
    assert!(!response.is_mock);
    assert_eq!(response.count_events("booking_retry"), 1);
    assert_eq!(response.attempted_candidates.len(), 1);
    assert_eq!(response.attempted_candidates[0].calls, 2);
    assert_eq!(calendar.created_event_count(), 1);
}

#[tokio::test]
async fn test_rebooking_same_session_slot_creates_no_duplicate() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let orchestrator = orchestrator(&calendar);
    let builder = RequestBuilder::new();

    let response = orchestrator.negotiate(&builder.clone().build()).await.unwrap();
    let slot = response.committed_slot.unwrap();
    assert_eq!(calendar.created_event_count(), 1);

    let coordinator = BookingCoordinator::new(calendar.clone());
    let request = BookingRequest::for_slot(
        response.session_id,
        &builder.validated(),
        slot,
        Duration::from_secs(1),
    );
    let replay = coordinator.book(&request).await;

    assert_eq!(
        replay.result,
        BookingResult::Confirmed {
            event_id: response.event_id.clone().unwrap()
        }
    );
    assert_eq!(calendar.created_event_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_resolver_exhausts_retries() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_reachable(false);
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Failed);
    let failure = response.failure.clone().unwrap();
    assert_eq!(failure.error_code, "RETRY_BUDGET_EXHAUSTED");
    assert_eq!(failure.hop, Some(Hop::Availability));

    let max_retries = orchestrator.config().policies.availability.max_retries;
    assert_eq!(failure.attempts, Some(max_retries + 1));
    assert_eq!(response.count_events("resolver_retry"), max_retries as usize);
    // Two participants per attempt
    assert_eq!(calendar.query_calls(), 2 * (max_retries + 1));
    assert_eq!(calendar.create_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_degraded_resolver_continues_with_unknown_availability() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let mut config = test_config();
    config.policies.availability.fallback = FallbackAction::Degrade;
    let attempts = config.policies.availability.max_attempts();
    calendar.fail_next_queries(2 * attempts);
    let orchestrator = orchestrator_with(config, &calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Confirmed);
    assert_eq!(response.committed_slot, Some(monday_slot(9, 0, 60)));
    assert!(response
        .risk_flags
        .values()
        .all(|status| *status == AvailabilityStatus::Unknown));
    assert_eq!(
        response.attempted_candidates[0].candidate.risk_participants.len(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_participant_becomes_risk_not_failure() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_latency(BOB, Duration::from_secs(2));
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Confirmed);
    assert_eq!(response.committed_slot, Some(monday_slot(9, 0, 60)));
    assert_eq!(
        response.risk_flags.get(&ParticipantId::new(BOB)),
        Some(&AvailabilityStatus::Unknown)
    );
    assert_eq!(
        response.risk_flags.get(&ParticipantId::new(ALICE)),
        Some(&AvailabilityStatus::Known)
    );
    assert_eq!(
        response.attempted_candidates[0].candidate.risk_participants,
        vec![ParticipantId::new(BOB)]
    );
    assert_eq!(response.count_events("resolver_retry"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_known_free_slot_outranks_risky_preferred_time() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_partial(BOB, vec![monday_slot(8, 30, 90)]);
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Confirmed);
    assert_eq!(response.committed_slot, Some(monday_slot(14, 0, 60)));
    assert_eq!(
        response.risk_flags.get(&ParticipantId::new(BOB)),
        Some(&AvailabilityStatus::Partial)
    );
    assert!(response.attempted_candidates[0].candidate.is_fully_confirmed());
}

#[tokio::test]
async fn test_cancel_before_resolution_fails_session() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let orchestrator = Arc::new(orchestrator(&calendar));

    let handle = orchestrator.spawn(&RequestBuilder::new().build()).unwrap();
    orchestrator.cancel(handle.id()).unwrap();
    let response = handle.wait().await.unwrap();

    assert_eq!(response.outcome, SessionState::Failed);
    assert_eq!(response.failure.unwrap().error_code, "SESSION_CANCELLED");
    assert_eq!(calendar.create_calls(), 0);
    assert_eq!(orchestrator.active_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_slow_resolution() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_latency(ALICE, Duration::from_secs(60));
    calendar.set_latency(BOB, Duration::from_secs(60));
    let mut config = test_config();
    config.policies.availability.timeout_ms = 120_000;
    config.session.timeout_ms = 300_000;
    let orchestrator = Arc::new(orchestrator_with(config, &calendar));

    let handle = orchestrator.spawn(&RequestBuilder::new().build()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        orchestrator.session_state(handle.id()),
        Some(SessionState::Resolving)
    );

    handle.cancel();
    let response = handle.wait().await.unwrap();

    assert_eq!(response.outcome, SessionState::Failed);
    assert_eq!(response.failure.unwrap().error_code, "SESSION_CANCELLED");
    assert_eq!(calendar.create_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_booking_reports_real_booking() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_booking_latency(Duration::from_millis(200));
    let orchestrator = Arc::new(orchestrator(&calendar));

    let handle = orchestrator.spawn(&RequestBuilder::new().build()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        orchestrator.session_state(handle.id()),
        Some(SessionState::Booking)
    );

    handle.cancel();
    let response = handle.wait().await.unwrap();

    assert_eq!(response.outcome, SessionState::Confirmed);
    assert!(!response.is_mock);
    assert!(response.failure.is_none());
    assert_eq!(calendar.create_calls(), 1);
    assert_eq!(calendar.created_event_count(), 1);
    assert_eq!(response.event_id, Some(calendar.created_events()[0].event_id.clone()));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_failing_booking_skips_mock() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_booking_latency(Duration::from_millis(200));
    calendar.fail_next_bookings(1);
    let orchestrator = Arc::new(orchestrator(&calendar));

    let handle = orchestrator.spawn(&RequestBuilder::new().build()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();
    let response = handle.wait().await.unwrap();

    assert_eq!(response.outcome, SessionState::Failed);
    assert!(!response.is_mock);
    assert!(response.event_id.is_none());
    let failure = response.failure.clone().unwrap();
    assert_eq!(failure.error_code, "SESSION_CANCELLED");
    assert_eq!(failure.hop, Some(Hop::Booking));
    assert_eq!(failure.attempts, Some(1));
    assert_eq!(calendar.create_calls(), 1);
    assert_eq!(calendar.created_event_count(), 0);
    assert_eq!(response.count_events("mock_booking_confirmed"), 0);
    assert!(matches!(
        response.attempted_candidates[0].result,
        AttemptResult::Abandoned { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_calendar_falls_back_to_mock_with_default_budgets() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_booking_latency(Duration::from_secs(3600));
    let config = AgendaConfig::default();
    let session_budget = config.session.timeout();
    let orchestrator = orchestrator_with(config, &calendar);

    let started = tokio::time::Instant::now();
    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::ConfirmedMock);
    assert!(response.is_mock);
    assert!(response.failure.is_none());
    assert!(started.elapsed() < session_budget);
    // The third call could not time out inside the session budget
    assert_eq!(calendar.create_calls(), 2);
    assert_eq!(response.count_events("booking_retry"), 1);
    assert_eq!(calendar.created_event_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_session_timeout_during_booking_names_the_hop() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_booking_latency(Duration::from_secs(3600));
    let mut config = test_config();
    config.session.timeout_ms = 300;
    let orchestrator = orchestrator_with(config, &calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Failed);
    assert!(!response.is_mock);
    let failure = response.failure.unwrap();
    assert_eq!(failure.error_code, "SESSION_TIMEOUT");
    assert_eq!(failure.hop, Some(Hop::Booking));
    assert_eq!(failure.attempts, Some(1));
    assert!(failure.message.contains("during booking hop attempt 1"));
}

#[tokio::test(start_paused = true)]
async fn test_session_timeout_fails_mid_resolution() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_latency(ALICE, Duration::from_secs(10));
    calendar.set_latency(BOB, Duration::from_secs(10));
    let mut config = test_config();
    config.session.timeout_ms = 300;
    config.policies.availability.timeout_ms = 5_000;
    let orchestrator = orchestrator_with(config, &calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Failed);
    assert_eq!(response.failure.unwrap().error_code, "SESSION_TIMEOUT");
    assert_eq!(calendar.create_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_attempt_budget_bounds_collaborator_calls() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.set_bookings_offline(true);
    let mut config = test_config();
    config.session.max_total_attempts = 2;
    let orchestrator = orchestrator_with(config, &calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Failed);
    let failure = response.failure.clone().unwrap();
    assert_eq!(failure.error_code, "ATTEMPT_BUDGET_EXCEEDED");
    assert_eq!(failure.attempts, Some(2));
    assert_eq!(calendar.create_calls(), 1);
    assert!(matches!(
        response.attempted_candidates[0].result,
        AttemptResult::Abandoned { .. }
    ));
}

#[tokio::test]
async fn test_concurrent_sessions_do_not_double_book() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let orchestrator = Arc::new(orchestrator(&calendar));

    let first = orchestrator
        .spawn(&RequestBuilder::new().with_participants(&[ALICE, BOB]).build())
        .unwrap();
    let second = orchestrator
        .spawn(&RequestBuilder::new().with_participants(&[ALICE, CAROL]).build())
        .unwrap();
    assert_ne!(first.id(), second.id());

    let first = first.wait().await.unwrap();
    let second = second.wait().await.unwrap();

    assert_eq!(first.outcome, SessionState::Confirmed);
    assert_eq!(second.outcome, SessionState::Confirmed);
    assert_ne!(first.committed_slot, second.committed_slot);
    assert_eq!(calendar.created_event_count(), 2);
    assert_eq!(orchestrator.active_sessions(), 0);
}

#[tokio::test]
async fn test_invalid_payload_creates_no_session() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let orchestrator = orchestrator(&calendar);

    let error = orchestrator
        .negotiate(&RequestBuilder::new().with_participants(&[]).build())
        .await
        .unwrap_err();
    assert_eq!(error, AgendaError::Validation(ValidationError::NoParticipants));

    let error = orchestrator
        .negotiate(&RequestBuilder::new().with_timezone("Mars/Olympus").build())
        .await
        .unwrap_err();
    assert_eq!(error.error_code(), "VALIDATION_ERROR");

    assert_eq!(orchestrator.active_sessions(), 0);
    assert_eq!(calendar.query_calls(), 0);
}

#[tokio::test]
async fn test_session_limits_fail_before_any_call() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().with_duration(600).build())
        .await
        .unwrap();

    assert_eq!(response.outcome, SessionState::Failed);
    assert_eq!(response.failure.unwrap().error_code, "INVALID_INPUT");
    assert_eq!(response.audit_trail.len(), 1);
    assert_eq!(response.audit_trail[0].from_state, SessionState::Created);
    assert_eq!(calendar.query_calls(), 0);
}

#[tokio::test]
async fn test_response_serializes_for_callers() {
    let calendar = Arc::new(InMemoryCalendar::new());
    let orchestrator = orchestrator(&calendar);

    let response = orchestrator
        .negotiate(&RequestBuilder::new().build())
        .await
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["outcome"], "CONFIRMED");
    assert_eq!(json["risk_flags"][ALICE], "KNOWN");
    assert_eq!(json["audit_trail"][0]["event"]["type"], "validated");
}
