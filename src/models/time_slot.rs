use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open `[start, end)` interval in UTC.
///
/// Slots are immutable once built. Equality, hashing and ordering all use the
/// UTC bounds only, so two slots normalized from different local wall-clock
/// triples are equal whenever they describe the same instant range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSlot", into = "RawTimeSlot")]
pub struct TimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct RawTimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawTimeSlot> for TimeSlot {
    type Error = String;

    fn try_from(raw: RawTimeSlot) -> Result<Self, Self::Error> {
        TimeSlot::new(raw.start, raw.end)
            .ok_or_else(|| format!("slot end {} is not after start {}", raw.end, raw.start))
    }
}

impl From<TimeSlot> for RawTimeSlot {
    fn from(slot: TimeSlot) -> Self {
        Self {
            start: slot.start,
            end: slot.end,
        }
    }
}

impl TimeSlot {
    /// Build a slot; `None` when the interval is empty or inverted
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// Slot of `length` starting at `start`; lengths under one minute are
    /// rounded up so the slot is never empty
    pub fn span(start: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start,
            end: start + length.max(Duration::minutes(1)),
        }
    }

    /// Normalize a local (date, time, timezone) triple plus a duration to UTC.
    ///
    /// Returns `None` for wall-clock times that do not exist in `tz` (DST gap).
    /// Ambiguous times (DST fold) resolve to the earlier instant.
    pub fn from_local(
        date: NaiveDate,
        time: NaiveTime,
        duration: Duration,
        tz: Tz,
    ) -> Option<Self> {
        let local = date.and_time(time);
        let start = match tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => return None,
        };
        let start = start.with_timezone(&Utc);
        Self::new(start, start + duration)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap: touching intervals do not overlap
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TimeSlot) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Intersection with another slot, if non-empty
    pub fn clip_to(&self, window: &TimeSlot) -> Option<TimeSlot> {
        TimeSlot::new(self.start.max(window.start), self.end.min(window.end))
    }

    /// Same length, shifted by `offset`
    pub fn shifted(&self, offset: Duration) -> TimeSlot {
        TimeSlot {
            start: self.start + offset,
            end: self.end + offset,
        }
    }

    /// Widen both ends by `margin`
    pub fn widened(&self, margin: Duration) -> TimeSlot {
        TimeSlot {
            start: self.start - margin,
            end: self.end + margin,
        }
    }

    /// Smallest slot covering every slot in the iterator
    pub fn envelope<'a>(slots: impl IntoIterator<Item = &'a TimeSlot>) -> Option<TimeSlot> {
        slots.into_iter().fold(None, |acc: Option<TimeSlot>, slot| {
            Some(match acc {
                None => *slot,
                Some(current) => TimeSlot {
                    start: current.start.min(slot.start),
                    end: current.end.max(slot.end),
                },
            })
        })
    }

    /// Sort and coalesce overlapping or touching intervals
    pub fn merge(mut slots: Vec<TimeSlot>) -> Vec<TimeSlot> {
        slots.sort();
        let mut merged: Vec<TimeSlot> = Vec::with_capacity(slots.len());
        for slot in slots {
            match merged.last_mut() {
                Some(last) if slot.start <= last.end => {
                    last.end = last.end.max(slot.end);
                }
                _ => merged.push(slot),
            }
        }
        merged
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%dT%H:%MZ"),
            self.end.format("%Y-%m-%dT%H:%MZ")
        )
    }
}
