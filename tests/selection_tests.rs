//! Slot enumeration and ranking through the public selection API

mod common;

use agenda_core::config::SchedulingConfig;
use agenda_core::models::ParticipantId;
use agenda_core::selection::{FixedClock, SlotSelectionEngine};
use chrono::{NaiveDate, TimeZone, Utc};
use common::*;
use std::sync::Arc;

fn engine() -> SlotSelectionEngine {
    SlotSelectionEngine::new(SchedulingConfig::default(), fixed_clock())
}

#[test]
fn test_iso_dates_and_weekdays_share_one_slot_set() {
    let request = RequestBuilder::new()
        .with_days(&["Monday", "2026-10-19", "2026-10-20"])
        .with_times(&["09:00"])
        .validated();

    let slots = engine().enumerate(&request);

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].slot, monday_slot(9, 0, 60));
    assert_eq!(
        slots[1].local_date,
        NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
    );
}

#[test]
fn test_dates_outside_horizon_are_dropped() {
    let request = RequestBuilder::new()
        .with_days(&["2026-10-17", "2026-11-30"])
        .validated();

    assert!(engine().enumerate(&request).is_empty());
}

#[test]
fn test_slot_starting_now_is_not_proposed() {
    let request = RequestBuilder::new()
        .with_days(&["Sunday"])
        .with_times(&["12:00", "13:00"])
        .validated();

    let slots = engine().enumerate(&request);

    assert_eq!(slots.len(), 1);
    assert_eq!(
        slots[0].slot.start(),
        Utc.with_ymd_and_hms(2026, 10, 18, 13, 0, 0).unwrap()
    );
}

#[test]
fn test_nonexistent_local_time_is_skipped() {
    // US clocks jump from 02:00 to 03:00 on Sunday 2026-03-08
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap(),
    ));
    let engine = SlotSelectionEngine::new(SchedulingConfig::default(), clock);
    let request = RequestBuilder::new()
        .with_days(&["2026-03-08"])
        .with_times(&["02:30", "03:30"])
        .with_timezone("America/New_York")
        .validated();

    let slots = engine.enumerate(&request);

    assert_eq!(slots.len(), 1);
    assert_eq!(
        slots[0].slot.start(),
        Utc.with_ymd_and_hms(2026, 3, 8, 7, 30, 0).unwrap()
    );
    assert_eq!(slots[0].time_preference, 1);
}

#[test]
fn test_earlier_date_breaks_preference_ties() {
    let request = RequestBuilder::new()
        .with_days(&["Tuesday", "Monday"])
        .with_times(&["09:00"])
        .validated();
    let availability = AvailabilityBuilder::new()
        .known("alice@example.com", vec![])
        .known("bob@example.com", vec![])
        .build();

    let candidates = engine().select(&request, &availability);

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].slot, monday_slot(9, 0, 60));
    assert_eq!(candidates[0].rank, 0);
    assert_eq!(candidates[1].rank, 1);
    assert!(candidates[0].score < candidates[1].score);
}

#[test]
fn test_unknown_participant_never_blocks() {
    let request = RequestBuilder::new().validated();
    let availability = AvailabilityBuilder::new()
        .known("alice@example.com", vec![monday_slot(9, 0, 60)])
        .unknown("bob@example.com")
        .build();

    let candidates = engine().select(&request, &availability);

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].slot, monday_slot(14, 0, 60));
    assert_eq!(
        candidates[0].risk_participants,
        vec![ParticipantId::new("bob@example.com")]
    );
    assert!(!candidates[0].is_fully_confirmed());
}

#[test]
fn test_missing_availability_counts_as_risk() {
    let request = RequestBuilder::new().validated();
    let availability = AvailabilityBuilder::new()
        .known("alice@example.com", vec![])
        .build();

    let candidates = engine().select(&request, &availability);

    assert_eq!(candidates.len(), 2);
    assert!(candidates
        .iter()
        .all(|c| c.risk_participants == vec![ParticipantId::new("bob@example.com")]));
}

#[test]
fn test_selection_is_deterministic() {
    let request = RequestBuilder::new()
        .with_days(&["Monday", "Wednesday", "Friday"])
        .with_times(&["16:00", "09:00", "11:30"])
        .with_timezone("Asia/Tokyo")
        .validated();
    let availability = AvailabilityBuilder::new()
        .known("alice@example.com", vec![monday_slot(0, 0, 120)])
        .unknown("bob@example.com")
        .build();

    let engine = engine();
    let first = engine.select(&request, &availability);
    let second = engine.select(&request, &availability);

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_no_alternatives_when_everyone_is_unknown() {
    let request = RequestBuilder::new().validated();
    let availability = AvailabilityBuilder::new()
        .unknown("alice@example.com")
        .unknown("bob@example.com")
        .build();

    assert!(engine()
        .suggest_alternatives(&request, &availability)
        .is_empty());
}
