use super::ParticipantId;
use chrono::{Duration, NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire shape of a scheduling request as it arrives from the transport layer.
///
/// Nothing here is trusted; [`crate::validation::validate_request`] turns it
/// into a [`SchedulingRequest`] or rejects it before any session exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingRequestPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub participants: Vec<String>,
    pub preferred_days: Vec<String>,
    pub preferred_times: Vec<String>,
    pub timezone: String,
}

/// A preferred day: a recurring weekday or one concrete local date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferredDay {
    Weekday(Weekday),
    Date(NaiveDate),
}

impl PreferredDay {
    /// Whether the given local date satisfies this preference
    pub fn matches(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        match self {
            Self::Weekday(weekday) => date.weekday() == *weekday,
            Self::Date(day) => *day == date,
        }
    }
}

impl fmt::Display for PreferredDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekday(weekday) => write!(f, "{weekday}"),
            Self::Date(date) => write!(f, "{date}"),
        }
    }
}

/// Validated, immutable scheduling request
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingRequest {
    title: String,
    description: Option<String>,
    duration_minutes: u32,
    participants: Vec<ParticipantId>,
    preferred_days: Vec<PreferredDay>,
    preferred_times: Vec<NaiveTime>,
    timezone: Tz,
}

impl SchedulingRequest {
    pub(crate) fn from_parts(
        title: String,
        description: Option<String>,
        duration_minutes: u32,
        participants: Vec<ParticipantId>,
        preferred_days: Vec<PreferredDay>,
        preferred_times: Vec<NaiveTime>,
        timezone: Tz,
    ) -> Self {
        Self {
            title,
            description,
            duration_minutes,
            participants,
            preferred_days,
            preferred_times,
            timezone,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Participants in order of first appearance, without duplicates
    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    pub fn preferred_days(&self) -> &[PreferredDay] {
        &self.preferred_days
    }

    /// Preferred start times; position is the preference rank
    pub fn preferred_times(&self) -> &[NaiveTime] {
        &self.preferred_times
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}
