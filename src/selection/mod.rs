//! # Slot Selection Engine
//!
//! Turns a validated request plus resolved availability into a finite,
//! deterministically ranked list of candidate slots.
//!
//! Enumeration expands preferred days × preferred times in the request
//! timezone, normalizes to UTC and keeps slots that start after "now" and no
//! later than the horizon. A slot is eligible unless some participant whose
//! data is trustworthy for it is busy. Ranking key, in order:
//!
//! 1. fewer risk participants
//! 2. earlier preferred-time index
//! 3. earlier local calendar date
//! 4. earlier UTC start

pub mod clock;

use crate::config::SchedulingConfig;
use crate::models::{
    AvailabilityMap, CandidateScore, CandidateSlot, ParticipantId, PreferredDay,
    SchedulingRequest, TimeSlot,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

pub use clock::{Clock, FixedClock, SystemClock};

/// One enumerated preferred slot before eligibility checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumeratedSlot {
    pub slot: TimeSlot,
    pub time_preference: usize,
    pub local_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct SlotSelectionEngine {
    settings: SchedulingConfig,
    clock: Arc<dyn Clock>,
}

impl SlotSelectionEngine {
    pub fn new(settings: SchedulingConfig, clock: Arc<dyn Clock>) -> Self {
        Self { settings, clock }
    }

    pub fn settings(&self) -> &SchedulingConfig {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn horizon(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now, now + Duration::days(i64::from(self.settings.horizon_days)))
    }

    fn in_horizon(slot: &TimeSlot, (now, end): (DateTime<Utc>, DateTime<Utc>)) -> bool {
        slot.start() > now && slot.start() <= end
    }

    /// Every preferred slot inside the horizon, deduplicated by UTC interval
    pub fn enumerate(&self, request: &SchedulingRequest) -> Vec<EnumeratedSlot> {
        let bounds = self.horizon(self.now());
        let tz = request.timezone();
        let first_date = bounds.0.with_timezone(&tz).date_naive();
        let last_date = bounds.1.with_timezone(&tz).date_naive();

        let mut dates: Vec<NaiveDate> = Vec::new();
        for day in request.preferred_days() {
            match day {
                PreferredDay::Weekday(_) => dates.extend(
                    first_date
                        .iter_days()
                        .take_while(|date| *date <= last_date)
                        .filter(|date| day.matches(*date)),
                ),
                PreferredDay::Date(date) => dates.push(*date),
            }
        }

        let mut seen: HashMap<TimeSlot, usize> = HashMap::new();
        let mut slots: Vec<EnumeratedSlot> = Vec::new();
        for date in dates {
            for (time_preference, time) in request.preferred_times().iter().enumerate() {
                let Some(slot) = TimeSlot::from_local(date, *time, request.duration(), tz) else {
                    debug!(date = %date, time = %time, tz = %tz, "Skipping nonexistent local time");
                    continue;
                };
                if !Self::in_horizon(&slot, bounds) {
                    continue;
                }
                match seen.get(&slot) {
                    Some(&index) => {
                        let existing = &mut slots[index];
                        if time_preference < existing.time_preference {
                            existing.time_preference = time_preference;
                        }
                    }
                    None => {
                        seen.insert(slot, slots.len());
                        slots.push(EnumeratedSlot {
                            slot,
                            time_preference,
                            local_date: date,
                        });
                    }
                }
            }
        }
        slots
    }

    /// Window the resolver should cover: every enumerated slot plus the
    /// alternative search radius. Falls back to the horizon when nothing
    /// enumerates.
    pub fn search_window(&self, request: &SchedulingRequest) -> TimeSlot {
        let radius = Duration::minutes(i64::from(self.settings.alternative_radius_minutes));
        let enumerated = self.enumerate(request);
        let envelope = TimeSlot::envelope(enumerated.iter().map(|e| &e.slot)).map(|w| w.widened(radius));
        envelope.unwrap_or_else(|| {
            let (now, end) = self.horizon(self.now());
            TimeSlot::span(now, end - now)
        })
    }

    /// Ranked eligible candidates; empty means no slot is available
    pub fn select(&self, request: &SchedulingRequest, availability: &AvailabilityMap) -> Vec<CandidateSlot> {
        let mut candidates: Vec<CandidateSlot> = self
            .enumerate(request)
            .into_iter()
            .filter(|e| !Self::is_blocked(request, availability, &e.slot))
            .map(|e| {
                let risk_participants = Self::risk_participants(request, availability, &e.slot);
                CandidateSlot {
                    slot: e.slot,
                    rank: 0,
                    score: CandidateScore {
                        risk_count: risk_participants.len(),
                        time_preference: e.time_preference,
                        local_date: e.local_date,
                        start: e.slot.start(),
                    },
                    risk_participants,
                }
            })
            .collect();

        candidates.sort_by(|a, b| a.score.cmp(&b.score));
        for (rank, candidate) in candidates.iter_mut().enumerate() {
            candidate.rank = rank;
        }

        debug!(
            title = %request.title(),
            candidates = candidates.len(),
            "Candidate slots ranked"
        );
        candidates
    }

    /// Nearby slots where every participant is known to be free.
    ///
    /// Diagnostic only: these are reported alongside `NO_SLOT_AVAILABLE` and
    /// never booked.
    pub fn suggest_alternatives(
        &self,
        request: &SchedulingRequest,
        availability: &AvailabilityMap,
    ) -> Vec<TimeSlot> {
        let step = i64::from(self.settings.alternative_step_minutes);
        if step == 0 {
            return Vec::new();
        }
        let steps = i64::from(self.settings.alternative_radius_minutes) / step;
        let bounds = self.horizon(self.now());
        let enumerated = self.enumerate(request);
        let preferred: BTreeSet<TimeSlot> = enumerated.iter().map(|e| e.slot).collect();

        let alternatives: BTreeSet<TimeSlot> = enumerated
            .iter()
            .flat_map(|e| {
                (-steps..=steps)
                    .filter(|k| *k != 0)
                    .map(move |k| e.slot.shifted(Duration::minutes(k * step)))
            })
            .filter(|slot| Self::in_horizon(slot, bounds))
            .filter(|slot| !preferred.contains(slot))
            .filter(|slot| Self::everyone_known_free(request, availability, slot))
            .collect();

        alternatives
            .into_iter()
            .take(self.settings.max_alternatives)
            .collect()
    }

    fn is_blocked(request: &SchedulingRequest, availability: &AvailabilityMap, slot: &TimeSlot) -> bool {
        request
            .participants()
            .iter()
            .filter_map(|participant| availability.get(participant))
            .any(|record| record.blocks(slot))
    }

    fn risk_participants(
        request: &SchedulingRequest,
        availability: &AvailabilityMap,
        slot: &TimeSlot,
    ) -> Vec<ParticipantId> {
        request
            .participants()
            .iter()
            .filter(|participant| {
                availability
                    .get(*participant)
                    .map_or(true, |record| !record.is_certain_for(slot))
            })
            .cloned()
            .collect()
    }

    fn everyone_known_free(
        request: &SchedulingRequest,
        availability: &AvailabilityMap,
        slot: &TimeSlot,
    ) -> bool {
        request.participants().iter().all(|participant| {
            availability
                .get(participant)
                .is_some_and(|record| record.is_certain_for(slot) && !record.is_busy_during(slot))
        })
    }
}
