//! Test data builders for scheduling requests and availability

#![allow(dead_code)]

use agenda_core::models::{
    AvailabilityMap, AvailabilityRecord, ParticipantId, SchedulingRequest,
    SchedulingRequestPayload, TimeSlot,
};
use agenda_core::validation::validate_request;

/// Builder pattern for scheduling request payloads.
///
/// Defaults: a 60 minute "Design review" for alice and bob on Monday at
/// 09:00 or 14:00 UTC.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    payload: SchedulingRequestPayload,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            payload: SchedulingRequestPayload {
                title: "Design review".to_string(),
                description: None,
                duration_minutes: 60,
                participants: vec![
                    "alice@example.com".to_string(),
                    "bob@example.com".to_string(),
                ],
                preferred_days: vec!["Monday".to_string()],
                preferred_times: vec!["09:00".to_string(), "14:00".to_string()],
                timezone: "UTC".to_string(),
            },
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.payload.title = title.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.payload.description = Some(description.to_string());
        self
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.payload.duration_minutes = minutes;
        self
    }

    pub fn with_participants(mut self, participants: &[&str]) -> Self {
        self.payload.participants = participants.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_days(mut self, days: &[&str]) -> Self {
        self.payload.preferred_days = days.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_times(mut self, times: &[&str]) -> Self {
        self.payload.preferred_times = times.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_timezone(mut self, timezone: &str) -> Self {
        self.payload.timezone = timezone.to_string();
        self
    }

    pub fn build(self) -> SchedulingRequestPayload {
        self.payload
    }

    pub fn validated(self) -> SchedulingRequest {
        validate_request(&self.payload).expect("builder payload should validate")
    }
}

/// Builder for availability maps handed straight to the selection engine
#[derive(Debug, Clone, Default)]
pub struct AvailabilityBuilder {
    records: AvailabilityMap,
}

impl AvailabilityBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn known(mut self, participant: &str, busy: Vec<TimeSlot>) -> Self {
        let id = ParticipantId::new(participant);
        self.records
            .insert(id.clone(), AvailabilityRecord::known(id, busy));
        self
    }

    pub fn unknown(mut self, participant: &str) -> Self {
        let id = ParticipantId::new(participant);
        self.records
            .insert(id.clone(), AvailabilityRecord::unknown(id, "calendar unreachable"));
        self
    }

    pub fn build(self) -> AvailabilityMap {
        self.records
    }
}
