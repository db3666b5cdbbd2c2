//! # Booking Coordinator
//!
//! Commits one slot through the calendar collaborator and reports a
//! three-way result: confirmed, conflict or unavailable. Retrying and
//! advancing across candidates is the orchestrator's job; the coordinator
//! performs exactly one call per `book`.

use crate::calendar::{CalendarClient, CalendarError, EventDraft};
use crate::constants::system::MOCK_EVENT_PREFIX;
use crate::messaging::{BookingRequest, BookingResponse, BookingResult};
use crate::models::{BookingConfirmation, EventId};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct BookingCoordinator {
    calendar: Arc<dyn CalendarClient>,
}

impl std::fmt::Debug for BookingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingCoordinator")
            .field("backend", &self.calendar.backend_name())
            .finish()
    }
}

impl BookingCoordinator {
    pub fn new(calendar: Arc<dyn CalendarClient>) -> Self {
        Self { calendar }
    }

    /// Try to create the event for `request.slot`, bounded by the request timeout
    pub async fn book(&self, request: &BookingRequest) -> BookingResponse {
        let draft = EventDraft {
            booking_key: request.idempotency_key,
            slot: request.slot,
            title: request.title.clone(),
            description: request.description.clone(),
            attendees: request.attendees.clone(),
        };

        let outcome = tokio::time::timeout(request.timeout(), self.calendar.create_event(&draft)).await;
        let result = match outcome {
            Ok(Ok(event_id)) => {
                info!(
                    session_id = %request.session_id,
                    slot = %request.slot,
                    event_id = %event_id,
                    backend = self.calendar.backend_name(),
                    "✅ BOOKING: Calendar confirmed slot"
                );
                BookingResult::Confirmed { event_id }
            }
            Ok(Err(CalendarError::Conflict { reason })) => {
                debug!(session_id = %request.session_id, slot = %request.slot, reason = %reason, "Booking conflict");
                BookingResult::Conflict { reason }
            }
            Ok(Err(CalendarError::Unreachable { reason })) => {
                warn!(session_id = %request.session_id, slot = %request.slot, reason = %reason, "Calendar unavailable");
                BookingResult::Unavailable { reason }
            }
            Err(_) => {
                let reason = format!("booking call timed out after {}ms", request.timeout_ms);
                warn!(session_id = %request.session_id, slot = %request.slot, "{reason}");
                BookingResult::Unavailable { reason }
            }
        };

        BookingResponse {
            session_id: request.session_id,
            slot: request.slot,
            idempotency_key: request.idempotency_key,
            result,
        }
    }

    /// Confirmation for a slot the calendar accepted
    pub fn confirmation(&self, request: &BookingRequest, event_id: EventId) -> BookingConfirmation {
        BookingConfirmation {
            event_id,
            slot: request.slot,
            booking_key: request.idempotency_key,
            is_mock: false,
        }
    }

    /// Synthesize a local, non-authoritative booking. Nothing reaches the
    /// calendar; the event id is derived from the idempotency key so the same
    /// session and slot always produce the same mock id.
    pub fn fallback_booking(&self, request: &BookingRequest) -> BookingConfirmation {
        let event_id = EventId::new(format!("{MOCK_EVENT_PREFIX}{}", request.idempotency_key));
        info!(
            session_id = %request.session_id,
            slot = %request.slot,
            event_id = %event_id,
            "⚠️ BOOKING: Calendar unreachable, recording mock booking"
        );
        BookingConfirmation {
            event_id,
            slot: request.slot,
            booking_key: request.idempotency_key,
            is_mock: true,
        }
    }
}
