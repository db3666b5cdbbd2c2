use agenda_core::models::{AvailabilityMap, AvailabilityRecord, ParticipantId, SchedulingRequestPayload, TimeSlot};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

pub const PARTICIPANT_POOL: &[&str] = &[
    "alice@example.com",
    "bob@example.com",
    "carol@example.com",
    "dave@example.com",
];

const DAY_POOL: &[&str] = &[
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

const TIMEZONE_POOL: &[&str] = &["UTC", "Europe/Berlin", "America/New_York", "Asia/Tokyo"];

/// Strategy for preferred times on a quarter-hour grid
pub fn preferred_time_strategy() -> impl Strategy<Value = String> {
    (0u32..24, prop::sample::select(vec![0u32, 15, 30, 45]))
        .prop_map(|(hour, minute)| format!("{hour:02}:{minute:02}"))
}

/// Strategy for valid scheduling payloads
pub fn payload_strategy() -> impl Strategy<Value = SchedulingRequestPayload> {
    (
        prop::sample::subsequence(PARTICIPANT_POOL.to_vec(), 1..=PARTICIPANT_POOL.len()),
        prop::sample::subsequence(DAY_POOL.to_vec(), 1..=3),
        prop::collection::vec(preferred_time_strategy(), 1..=4),
        prop::sample::select(vec![15i64, 30, 45, 60, 90]),
        prop::sample::select(TIMEZONE_POOL.to_vec()),
    )
        .prop_map(|(participants, days, times, duration, timezone)| SchedulingRequestPayload {
            title: "Generated meeting".to_string(),
            description: None,
            duration_minutes: duration,
            participants: participants.into_iter().map(str::to_string).collect(),
            preferred_days: days.into_iter().map(str::to_string).collect(),
            preferred_times: times,
            timezone: timezone.to_string(),
        })
}

/// Strategy for a busy interval inside the week after 2026-10-18
pub fn busy_slot_strategy() -> impl Strategy<Value = TimeSlot> {
    (0i64..7 * 24 * 4, 1i64..=12).prop_map(|(quarter, length)| {
        let base = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap();
        let start = base + Duration::minutes(quarter * 15);
        TimeSlot::new(start, start + Duration::minutes(length * 15)).unwrap()
    })
}

/// Strategy for availability over the whole participant pool; some
/// participants may come back `UNKNOWN`
pub fn availability_strategy() -> impl Strategy<Value = AvailabilityMap> {
    prop::collection::vec(
        (any::<bool>(), prop::collection::vec(busy_slot_strategy(), 0..6)),
        PARTICIPANT_POOL.len(),
    )
    .prop_map(|entries| {
        PARTICIPANT_POOL
            .iter()
            .zip(entries)
            .map(|(name, (reachable, busy))| {
                let id = ParticipantId::new(*name);
                let record = if reachable {
                    AvailabilityRecord::known(id.clone(), busy)
                } else {
                    AvailabilityRecord::unknown(id.clone(), "calendar unreachable")
                };
                (id, record)
            })
            .collect()
    })
}
