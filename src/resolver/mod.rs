//! # Availability Resolver
//!
//! Answers "when is everyone busy?" for one session. Each participant is
//! queried concurrently under the per-participant timeout; failures for a
//! single participant become `UNKNOWN` records instead of failing the call.
//! Only when every participant's query failed because the backend was
//! unreachable does the resolver report a resolver-wide error, which the
//! orchestrator retries.

use crate::calendar::{BusyPeriods, CalendarClient, CalendarError};
use crate::messaging::{AvailabilityRequest, AvailabilityResponse};
use crate::models::{AvailabilityMap, AvailabilityRecord, ParticipantId, TimeSlot};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// No participant could be queried at all
    #[error("availability backend unreachable for all {participants} participants: {reason}")]
    BackendUnreachable { participants: usize, reason: String },
}

enum QueryOutcome {
    Answered(AvailabilityRecord),
    Unreachable(ParticipantId, String),
}

/// Resolves busy data for a participant set over a window
#[derive(Clone)]
pub struct AvailabilityResolver {
    calendar: Arc<dyn CalendarClient>,
}

impl std::fmt::Debug for AvailabilityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityResolver")
            .field("backend", &self.calendar.backend_name())
            .finish()
    }
}

impl AvailabilityResolver {
    pub fn new(calendar: Arc<dyn CalendarClient>) -> Self {
        Self { calendar }
    }

    /// Resolve availability for every participant of `request`.
    ///
    /// The returned map always holds exactly one record per requested
    /// participant.
    pub async fn resolve(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse, ResolverError> {
        let timeout = request.timeout();
        let queries = request
            .participants
            .iter()
            .map(|participant| self.query_participant(participant, &request.window, timeout));
        let outcomes = join_all(queries).await;

        let all_unreachable = !outcomes.is_empty()
            && outcomes
                .iter()
                .all(|outcome| matches!(outcome, QueryOutcome::Unreachable(..)));
        if all_unreachable {
            let reason = outcomes
                .iter()
                .find_map(|outcome| match outcome {
                    QueryOutcome::Unreachable(_, reason) => Some(reason.clone()),
                    QueryOutcome::Answered(_) => None,
                })
                .unwrap_or_default();
            warn!(
                session_id = %request.session_id,
                participants = outcomes.len(),
                reason = %reason,
                "Availability backend unreachable for every participant"
            );
            return Err(ResolverError::BackendUnreachable {
                participants: outcomes.len(),
                reason,
            });
        }

        let records: AvailabilityMap = outcomes
            .into_iter()
            .map(|outcome| match outcome {
                QueryOutcome::Answered(record) => (record.participant.clone(), record),
                QueryOutcome::Unreachable(participant, reason) => {
                    (participant.clone(), AvailabilityRecord::unknown(participant, reason))
                }
            })
            .collect();

        debug!(
            session_id = %request.session_id,
            window = %request.window,
            records = records.len(),
            "Availability resolved"
        );

        Ok(AvailabilityResponse {
            session_id: request.session_id,
            window: request.window,
            records,
        })
    }

    async fn query_participant(
        &self,
        participant: &ParticipantId,
        window: &TimeSlot,
        timeout: Duration,
    ) -> QueryOutcome {
        match tokio::time::timeout(timeout, self.calendar.query_busy(participant, window)).await {
            Ok(Ok(periods)) => QueryOutcome::Answered(Self::to_record(participant, window, periods)),
            Ok(Err(CalendarError::Unreachable { reason })) => {
                debug!(participant = %participant, reason = %reason, "Busy query failed");
                QueryOutcome::Unreachable(participant.clone(), reason)
            }
            Ok(Err(CalendarError::Conflict { reason })) => QueryOutcome::Answered(
                AvailabilityRecord::unknown(participant.clone(), format!("unexpected reply: {reason}")),
            ),
            Err(_) => {
                debug!(participant = %participant, timeout_ms = timeout.as_millis() as u64, "Busy query timed out");
                QueryOutcome::Answered(AvailabilityRecord::unknown(
                    participant.clone(),
                    format!("query timed out after {}ms", timeout.as_millis()),
                ))
            }
        }
    }

    fn to_record(participant: &ParticipantId, window: &TimeSlot, periods: BusyPeriods) -> AvailabilityRecord {
        let clip = |slots: Vec<TimeSlot>| -> Vec<TimeSlot> {
            slots.iter().filter_map(|slot| slot.clip_to(window)).collect()
        };
        let busy = clip(periods.intervals);
        let missing = clip(periods.missing);
        if missing.is_empty() {
            AvailabilityRecord::known(participant.clone(), busy)
        } else {
            let detail = format!("{} sub-window(s) without data", missing.len());
            AvailabilityRecord::partial(participant.clone(), busy, missing, detail)
        }
    }
}
