use super::{ParticipantId, TimeSlot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How much the resolver knows about one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    /// Full busy data for the window
    Known,
    /// Source unreachable or timed out; nothing is known
    Unknown,
    /// Some data missing; `missing` on the record narrows where, when present
    Partial,
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known => write!(f, "KNOWN"),
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Partial => write!(f, "PARTIAL"),
        }
    }
}

/// Busy data for one participant over one resolver window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub participant: ParticipantId,
    pub status: AvailabilityStatus,
    /// Sorted, merged busy intervals clipped to the resolver window
    pub busy: Vec<TimeSlot>,
    /// Sub-windows the backend could not answer for (only for `Partial`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<TimeSlot>,
    /// Why the record is not `Known`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Availability for every participant of a request
pub type AvailabilityMap = BTreeMap<ParticipantId, AvailabilityRecord>;

impl AvailabilityRecord {
    pub fn known(participant: ParticipantId, busy: Vec<TimeSlot>) -> Self {
        Self {
            participant,
            status: AvailabilityStatus::Known,
            busy: TimeSlot::merge(busy),
            missing: Vec::new(),
            detail: None,
        }
    }

    pub fn unknown(participant: ParticipantId, detail: impl Into<String>) -> Self {
        Self {
            participant,
            status: AvailabilityStatus::Unknown,
            busy: Vec::new(),
            missing: Vec::new(),
            detail: Some(detail.into()),
        }
    }

    pub fn partial(
        participant: ParticipantId,
        busy: Vec<TimeSlot>,
        missing: Vec<TimeSlot>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            participant,
            status: AvailabilityStatus::Partial,
            busy: TimeSlot::merge(busy),
            missing: TimeSlot::merge(missing),
            detail: Some(detail.into()),
        }
    }

    /// Whether this record fully answers for `slot`.
    ///
    /// `Partial` records with explicit missing windows are certain for slots
    /// that do not touch those windows; without that detail they are
    /// uncertain everywhere.
    pub fn is_certain_for(&self, slot: &TimeSlot) -> bool {
        match self.status {
            AvailabilityStatus::Known => true,
            AvailabilityStatus::Unknown => false,
            AvailabilityStatus::Partial => {
                !self.missing.is_empty() && !self.missing.iter().any(|gap| gap.overlaps(slot))
            }
        }
    }

    pub fn is_busy_during(&self, slot: &TimeSlot) -> bool {
        self.busy.iter().any(|busy| busy.overlaps(slot))
    }

    /// A hard conflict: the data is trustworthy for `slot` and says busy
    pub fn blocks(&self, slot: &TimeSlot) -> bool {
        self.is_certain_for(slot) && self.is_busy_during(slot)
    }

    /// Free gaps inside `window`, derived from the busy intervals
    pub fn free_intervals(&self, window: &TimeSlot) -> Vec<TimeSlot> {
        let mut free = Vec::new();
        let mut cursor = window.start();
        for busy in self.busy.iter().filter_map(|b| b.clip_to(window)) {
            if let Some(gap) = TimeSlot::new(cursor, busy.start()) {
                free.push(gap);
            }
            cursor = cursor.max(busy.end());
        }
        if let Some(tail) = TimeSlot::new(cursor, window.end()) {
            free.push(tail);
        }
        free
    }
}
