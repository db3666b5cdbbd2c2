use super::{ParticipantId, TimeSlot};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Ranking key of a candidate. Field order is the tie-break order; the derived
/// `Ord` compares lexicographically, which makes the ranking total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Participants without confirmed availability for the slot
    pub risk_count: usize,
    /// Index of the slot's start time in the request's preferred times
    pub time_preference: usize,
    /// Calendar date of the slot in the request timezone
    pub local_date: NaiveDate,
    pub start: DateTime<Utc>,
}

/// Eligible, ranked slot produced by the selection engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub slot: TimeSlot,
    /// 0-based position in the ranking
    pub rank: usize,
    pub score: CandidateScore,
    /// Participants whose availability is `UNKNOWN`/`PARTIAL` for this slot
    pub risk_participants: Vec<ParticipantId>,
}

impl CandidateSlot {
    pub fn is_fully_confirmed(&self) -> bool {
        self.risk_participants.is_empty()
    }
}
