//! Input validation for scheduling requests
//!
//! Turns an untrusted [`SchedulingRequestPayload`] into a [`SchedulingRequest`].
//! Anything rejected here never becomes a session.

use crate::models::{ParticipantId, PreferredDay, SchedulingRequest, SchedulingRequestPayload};
use chrono::{NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use std::collections::HashSet;
use thiserror::Error;

/// Maximum title length accepted from the transport layer
const MAX_TITLE_LENGTH: usize = 500;

/// Reasons a request is rejected before a session is created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("title too long: {length} chars (max: {max})")]
    TitleTooLong { length: usize, max: usize },

    #[error("duration_minutes must be positive, got {0}")]
    NonPositiveDuration(i64),

    #[error("duration_minutes too large: {0}")]
    DurationOutOfRange(i64),

    #[error("participants must not be empty")]
    NoParticipants,

    #[error("participant identifier at position {0} is blank")]
    BlankParticipant(usize),

    #[error("preferred_days must not be empty")]
    NoPreferredDays,

    #[error("unrecognized preferred day '{0}'")]
    InvalidDay(String),

    #[error("preferred_times must not be empty")]
    NoPreferredTimes,

    #[error("unrecognized preferred time '{0}' (expected HH:MM)")]
    InvalidTime(String),

    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),
}

/// Validate a request payload
pub fn validate_request(
    payload: &SchedulingRequestPayload,
) -> Result<SchedulingRequest, ValidationError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong {
            length: title.chars().count(),
            max: MAX_TITLE_LENGTH,
        });
    }

    let duration_minutes = validate_duration(payload.duration_minutes)?;
    let timezone = parse_timezone(&payload.timezone)?;
    let participants = validate_participants(&payload.participants)?;

    if payload.preferred_days.is_empty() {
        return Err(ValidationError::NoPreferredDays);
    }
    let preferred_days = payload
        .preferred_days
        .iter()
        .map(|day| parse_preferred_day(day))
        .collect::<Result<Vec<_>, _>>()?;

    if payload.preferred_times.is_empty() {
        return Err(ValidationError::NoPreferredTimes);
    }
    let mut seen = HashSet::new();
    let mut preferred_times = Vec::with_capacity(payload.preferred_times.len());
    for raw in &payload.preferred_times {
        let time = parse_preferred_time(raw)?;
        // The first occurrence keeps its preference rank
        if seen.insert(time) {
            preferred_times.push(time);
        }
    }

    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Ok(SchedulingRequest::from_parts(
        title.to_string(),
        description,
        duration_minutes,
        participants,
        preferred_days,
        preferred_times,
        timezone,
    ))
}

fn validate_duration(minutes: i64) -> Result<u32, ValidationError> {
    if minutes <= 0 {
        return Err(ValidationError::NonPositiveDuration(minutes));
    }
    u32::try_from(minutes).map_err(|_| ValidationError::DurationOutOfRange(minutes))
}

fn validate_participants(raw: &[String]) -> Result<Vec<ParticipantId>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::NoParticipants);
    }
    let mut seen = HashSet::new();
    let mut participants = Vec::with_capacity(raw.len());
    for (position, id) in raw.iter().enumerate() {
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError::BlankParticipant(position));
        }
        if seen.insert(id.to_string()) {
            participants.push(ParticipantId::new(id));
        }
    }
    Ok(participants)
}

/// Resolve an IANA timezone identifier
pub fn parse_timezone(raw: &str) -> Result<Tz, ValidationError> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| ValidationError::InvalidTimezone(raw.to_string()))
}

/// Parse a weekday name (`Monday`, `mon`) or an ISO date (`2026-10-19`)
pub fn parse_preferred_day(raw: &str) -> Result<PreferredDay, ValidationError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(PreferredDay::Date(date));
    }
    trimmed
        .parse::<Weekday>()
        .map(PreferredDay::Weekday)
        .map_err(|_| ValidationError::InvalidDay(raw.to_string()))
}

/// Parse a 24-hour wall-clock time (`09:00`, `9:00`, `09:00:00`)
pub fn parse_preferred_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTime(raw.to_string()))
}
