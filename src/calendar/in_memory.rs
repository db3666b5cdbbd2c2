//! In-process calendar with fault injection.

use super::{BusyPeriods, CalendarClient, CalendarError, EventDraft};
use crate::models::{BookingKey, EventId, ParticipantId, TimeSlot};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;

/// An event stored by [`InMemoryCalendar`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub event_id: EventId,
    pub booking_key: BookingKey,
    pub slot: TimeSlot,
    pub title: String,
    pub attendees: Vec<ParticipantId>,
}

/// JSON fixture describing a calendar's contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarFixture {
    pub busy: BTreeMap<ParticipantId, Vec<TimeSlot>>,
    /// Participants whose busy queries always fail
    pub unreachable_participants: Vec<ParticipantId>,
    /// Participants whose data has holes, with the missing windows
    pub partial: BTreeMap<ParticipantId, Vec<TimeSlot>>,
    /// Slots the backend rejects regardless of attendees
    pub forced_conflicts: Vec<TimeSlot>,
    /// Whole backend down
    pub offline: bool,
    /// Busy queries answer but event creation fails
    pub bookings_offline: bool,
}

#[derive(Debug, Default)]
struct CalendarState {
    busy: HashMap<ParticipantId, Vec<TimeSlot>>,
    unreachable: HashSet<ParticipantId>,
    latency: HashMap<ParticipantId, Duration>,
    partial: HashMap<ParticipantId, Vec<TimeSlot>>,
    forced_conflicts: HashSet<TimeSlot>,
    events: Vec<CalendarEvent>,
    query_outages: u32,
    booking_outages: u32,
    booking_latency: Option<Duration>,
}

impl CalendarState {
    fn events_for<'a>(
        &'a self,
        participant: &'a ParticipantId,
    ) -> impl Iterator<Item = &'a CalendarEvent> + 'a {
        self.events
            .iter()
            .filter(move |event| event.attendees.contains(participant))
    }

    fn conflict_for(&self, draft: &EventDraft) -> Option<String> {
        if self.forced_conflicts.contains(&draft.slot) {
            return Some(format!("slot {} is blocked", draft.slot));
        }
        for attendee in &draft.attendees {
            let busy = self
                .busy
                .get(attendee)
                .is_some_and(|busy| busy.iter().any(|b| b.overlaps(&draft.slot)));
            let booked = self
                .events_for(attendee)
                .any(|event| event.slot.overlaps(&draft.slot));
            if busy || booked {
                return Some(format!("{attendee} is busy during {}", draft.slot));
            }
        }
        None
    }
}

/// Calendar backend kept entirely in memory.
///
/// Mutators take `&self` so a shared `Arc<InMemoryCalendar>` can be
/// reconfigured while sessions run.
#[derive(Debug)]
pub struct InMemoryCalendar {
    state: RwLock<CalendarState>,
    reachable: AtomicBool,
    bookings_offline: AtomicBool,
    query_calls: AtomicU32,
    create_calls: AtomicU32,
}

impl Default for InMemoryCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CalendarState::default()),
            reachable: AtomicBool::new(true),
            bookings_offline: AtomicBool::new(false),
            query_calls: AtomicU32::new(0),
            create_calls: AtomicU32::new(0),
        }
    }

    pub fn from_fixture(fixture: CalendarFixture) -> Self {
        let calendar = Self::new();
        {
            let mut state = calendar.state.write();
            state.busy = fixture.busy.into_iter().collect();
            state.unreachable = fixture.unreachable_participants.into_iter().collect();
            state.partial = fixture.partial.into_iter().collect();
            state.forced_conflicts = fixture.forced_conflicts.into_iter().collect();
        }
        calendar.set_reachable(!fixture.offline);
        calendar.set_bookings_offline(fixture.bookings_offline);
        calendar
    }

    /// Builder-style variant of [`InMemoryCalendar::add_busy`]
    pub fn with_busy(self, participant: impl Into<ParticipantId>, slot: TimeSlot) -> Self {
        self.add_busy(participant, slot);
        self
    }

    pub fn add_busy(&self, participant: impl Into<ParticipantId>, slot: TimeSlot) {
        self.state
            .write()
            .busy
            .entry(participant.into())
            .or_default()
            .push(slot);
    }

    /// Take the whole backend up or down
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Event creation fails while busy queries keep working
    pub fn set_bookings_offline(&self, offline: bool) {
        self.bookings_offline.store(offline, Ordering::SeqCst);
    }

    /// Busy queries for `participant` fail with `Unreachable`
    pub fn set_participant_unreachable(&self, participant: impl Into<ParticipantId>) {
        self.state.write().unreachable.insert(participant.into());
    }

    /// Busy queries for `participant` take this long to answer
    pub fn set_latency(&self, participant: impl Into<ParticipantId>, latency: Duration) {
        self.state.write().latency.insert(participant.into(), latency);
    }

    /// Answers for `participant` are incomplete over `missing`
    pub fn set_partial(&self, participant: impl Into<ParticipantId>, missing: Vec<TimeSlot>) {
        self.state.write().partial.insert(participant.into(), missing);
    }

    /// Reject any booking for exactly this slot
    pub fn force_conflict(&self, slot: TimeSlot) {
        self.state.write().forced_conflicts.insert(slot);
    }

    /// The next `count` busy queries fail with `Unreachable`
    pub fn fail_next_queries(&self, count: u32) {
        self.state.write().query_outages = count;
    }

    /// The next `count` event creations fail with `Unreachable`
    pub fn fail_next_bookings(&self, count: u32) {
        self.state.write().booking_outages = count;
    }

    /// Event creation takes this long to answer
    pub fn set_booking_latency(&self, latency: Duration) {
        self.state.write().booking_latency = Some(latency);
    }

    pub fn created_events(&self) -> Vec<CalendarEvent> {
        self.state.read().events.clone()
    }

    pub fn created_event_count(&self) -> usize {
        self.state.read().events.len()
    }

    pub fn query_calls(&self) -> u32 {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn take_outage(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl CalendarClient for InMemoryCalendar {
    async fn query_busy(
        &self,
        participant: &ParticipantId,
        window: &TimeSlot,
    ) -> Result<BusyPeriods, CalendarError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);

        let latency = self.state.read().latency.get(participant).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if !self.reachable.load(Ordering::SeqCst) {
            return Err(CalendarError::Unreachable {
                reason: "calendar backend offline".to_string(),
            });
        }

        let mut state = self.state.write();
        if Self::take_outage(&mut state.query_outages) {
            return Err(CalendarError::Unreachable {
                reason: "transient calendar outage".to_string(),
            });
        }
        if state.unreachable.contains(participant) {
            return Err(CalendarError::Unreachable {
                reason: format!("no calendar source for {participant}"),
            });
        }

        let mut intervals: Vec<TimeSlot> = state
            .busy
            .get(participant)
            .into_iter()
            .flatten()
            .chain(state.events_for(participant).map(|event| &event.slot))
            .filter_map(|slot| slot.clip_to(window))
            .collect();
        intervals.sort();

        let missing = state
            .partial
            .get(participant)
            .into_iter()
            .flatten()
            .filter_map(|slot| slot.clip_to(window))
            .collect();

        debug!(
            participant = %participant,
            window = %window,
            busy = intervals.len(),
            "In-memory busy query"
        );

        Ok(BusyPeriods { intervals, missing })
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<EventId, CalendarError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let latency = self.state.read().booking_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if !self.reachable.load(Ordering::SeqCst) || self.bookings_offline.load(Ordering::SeqCst) {
            return Err(CalendarError::Unreachable {
                reason: "calendar backend offline".to_string(),
            });
        }

        let mut state = self.state.write();
        if Self::take_outage(&mut state.booking_outages) {
            return Err(CalendarError::Unreachable {
                reason: "transient calendar outage".to_string(),
            });
        }

        if let Some(existing) = state
            .events
            .iter()
            .find(|event| event.booking_key == draft.booking_key)
        {
            debug!(key = %draft.booking_key, "Repeated booking key, returning existing event");
            return Ok(existing.event_id.clone());
        }

        if let Some(reason) = state.conflict_for(draft) {
            return Err(CalendarError::Conflict { reason });
        }

        let event_id = EventId::new(format!("evt_{:06}", state.events.len() + 1));
        state.events.push(CalendarEvent {
            event_id: event_id.clone(),
            booking_key: draft.booking_key,
            slot: draft.slot,
            title: draft.title.clone(),
            attendees: draft.attendees.clone(),
        });
        Ok(event_id)
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
