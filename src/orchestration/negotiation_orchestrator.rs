//! # Negotiation Orchestrator
//!
//! Drives one session per request through
//! `CREATED → RESOLVING → SELECTING → BOOKING → terminal`, consulting the hop
//! policy table for every retry, timeout and fallback decision.
//!
//! ## Budgets
//!
//! - per hop: `timeout_ms` bounds each call (each participant query for the
//!   availability hop), `max_retries` bounds transient retries
//! - per session: `session.timeout_ms` bounds wall-clock time and
//!   `session.max_total_attempts` bounds collaborator calls across all hops
//!
//! Every hop waits at most `min(hop timeout, remaining session budget)`.
//!
//! ## Cancellation
//!
//! Availability queries and backoff sleeps are abandoned as soon as a
//! cancellation arrives. A booking call already in flight is allowed to
//! finish; if it confirms, the session reports `CONFIRMED`.

use super::error_classifier::{ErrorCategory, ErrorClassifier, ErrorContext, StandardErrorClassifier};
use super::policy::{FallbackAction, Hop};
use super::session_registry::{SessionEntry, SessionRegistry};
use crate::booking::BookingCoordinator;
use crate::calendar::CalendarClient;
use crate::config::{AgendaConfig, ConfigManager};
use crate::constants::events;
use crate::error::{AgendaError, Result};
use crate::logging::{log_agent_message, log_error, log_hop_attempt};
use crate::messaging::{AgentMessage, AvailabilityRequest, BookingRequest, BookingResult};
use crate::models::{
    AttemptResult, AvailabilityMap, AvailabilityRecord, AvailabilityStatus, BookingAttempt,
    BookingConfirmation, CandidateSlot, SchedulingRequest, SchedulingRequestPayload, Session,
    SessionId, SessionResponse,
};
use crate::resolver::AvailabilityResolver;
use crate::selection::{Clock, SlotSelectionEngine, SystemClock};
use crate::state_machine::{FailureCause, HopProgress, SessionEvent, SessionState};
use crate::validation::validate_request;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How a phase of the session ended
enum PhaseOutcome<T> {
    /// Move on to the next phase
    Continue(T),
    /// The session already reached a terminal state
    Settled,
    /// The session must end in `FAILED`
    Failed(FailureCause),
}

/// First of: cancellation, session deadline, or the awaited work
enum Race<T> {
    Cancelled,
    TimedOut,
    Done(T),
}

/// Resolves once the session has been cancelled; never resolves if the
/// cancellation side is gone
async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Per-run bookkeeping for one session
struct SessionRun {
    id: SessionId,
    session: Arc<RwLock<Session>>,
    request: Arc<SchedulingRequest>,
    cancel: watch::Receiver<bool>,
    started: Instant,
    deadline: Instant,
    /// Hop call currently charged, for session-level failure reports
    progress: Option<HopProgress>,
}

impl SessionRun {
    fn apply(&self, event: SessionEvent) -> Result<SessionState> {
        Ok(self.session.write().apply(event)?)
    }

    fn fail(&self, cause: FailureCause) -> Result<()> {
        self.apply(SessionEvent::Fail(cause)).map(|_| ())
    }

    fn commit(&self, confirmation: BookingConfirmation) -> Result<SessionState> {
        Ok(self.session.write().commit(confirmation)?)
    }

    fn record(&self, candidate: &CandidateSlot, calls: u32, result: AttemptResult) {
        self.session.write().record_attempt(BookingAttempt {
            candidate: candidate.clone(),
            calls,
            result,
        });
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    fn timeout_cause(&self) -> FailureCause {
        FailureCause::SessionTimeout {
            elapsed_ms: millis(self.started.elapsed()),
            during: self.progress,
        }
    }

    fn cancelled_cause(&self) -> FailureCause {
        FailureCause::Cancelled {
            during: self.progress,
        }
    }

    fn enter_call(&mut self, hop: Hop, attempts: u32) {
        self.progress = Some(HopProgress { hop, attempts });
    }

    /// Cancellation or an exhausted time budget, cancellation first
    fn interruption(&self) -> Option<FailureCause> {
        if self.is_cancelled() {
            Some(self.cancelled_cause())
        } else if self.remaining().is_zero() {
            Some(self.timeout_cause())
        } else {
            None
        }
    }

    /// Count one collaborator call against the session attempt budget
    fn charge_call(&self, max_total_attempts: u32) -> std::result::Result<u32, FailureCause> {
        let mut session = self.session.write();
        if session.hop_calls() >= max_total_attempts {
            return Err(FailureCause::AttemptBudgetExceeded {
                attempts: session.hop_calls(),
            });
        }
        Ok(session.count_hop_call())
    }

    /// Sleep for a retry delay unless cancelled or out of time first
    async fn backoff(&mut self, delay: Duration) -> Option<FailureCause> {
        let deadline = self.deadline;
        let race = tokio::select! {
            biased;
            _ = wait_cancelled(&mut self.cancel) => Race::Cancelled,
            _ = tokio::time::sleep_until(deadline) => Race::TimedOut,
            _ = tokio::time::sleep(delay) => Race::Done(()),
        };
        match race {
            Race::Cancelled => Some(self.cancelled_cause()),
            Race::TimedOut => Some(self.timeout_cause()),
            Race::Done(()) => None,
        }
    }
}

/// Handle to a session running on the tokio runtime
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    cancel: Arc<watch::Sender<bool>>,
    task: JoinHandle<SessionResponse>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Wait for the session to reach a terminal state
    pub async fn wait(self) -> Result<SessionResponse> {
        self.task
            .await
            .map_err(|e| AgendaError::StateTransition(format!("session task {} failed: {e}", self.id)))
    }
}

/// Owns every in-flight session and the components they drive
pub struct NegotiationOrchestrator {
    config: AgendaConfig,
    resolver: AvailabilityResolver,
    selector: SlotSelectionEngine,
    coordinator: BookingCoordinator,
    classifier: Arc<dyn ErrorClassifier>,
    sessions: SessionRegistry,
}

impl std::fmt::Debug for NegotiationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegotiationOrchestrator")
            .field("classifier", &self.classifier.classifier_name())
            .field("active_sessions", &self.sessions.len())
            .finish()
    }
}

impl NegotiationOrchestrator {
    pub fn new(
        config: AgendaConfig,
        calendar: Arc<dyn CalendarClient>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            backend = calendar.backend_name(),
            horizon_days = config.scheduling.horizon_days,
            session_timeout_ms = config.session.timeout_ms,
            "🏗️ ORCHESTRATOR: Creating negotiation orchestrator"
        );
        Ok(Self {
            resolver: AvailabilityResolver::new(Arc::clone(&calendar)),
            selector: SlotSelectionEngine::new(config.scheduling.clone(), clock),
            coordinator: BookingCoordinator::new(calendar),
            classifier: Arc::new(StandardErrorClassifier::new(config.policies.clone())),
            sessions: SessionRegistry::new(),
            config,
        })
    }

    /// Build from loaded configuration with the wall clock
    pub fn from_config_manager(
        manager: &ConfigManager,
        calendar: Arc<dyn CalendarClient>,
    ) -> Result<Self> {
        Self::new(manager.config().clone(), calendar, Arc::new(SystemClock))
    }

    /// Replace the error classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &AgendaConfig {
        &self.config
    }

    pub fn selector(&self) -> &SlotSelectionEngine {
        &self.selector
    }

    /// Validate a request and run its session to completion.
    ///
    /// Validation failures are returned as errors and create no session;
    /// every other outcome is a [`SessionResponse`].
    pub async fn negotiate(&self, payload: &SchedulingRequestPayload) -> Result<SessionResponse> {
        let (entry, cancel) = self.open_session(payload)?;
        Ok(self.run_session(entry, cancel).await)
    }

    /// Validate a request and run its session in the background
    pub fn spawn(self: &Arc<Self>, payload: &SchedulingRequestPayload) -> Result<SessionHandle> {
        let (entry, cancel) = self.open_session(payload)?;
        let id = entry.session().read().id();
        let sender = Arc::clone(entry.cancel_sender());
        let orchestrator = Arc::clone(self);
        let task = tokio::spawn(async move { orchestrator.run_session(entry, cancel).await });
        Ok(SessionHandle {
            id,
            cancel: sender,
            task,
        })
    }

    /// Ask a running session to stop
    pub fn cancel(&self, id: SessionId) -> Result<()> {
        info!(session_id = %id, event = events::SESSION_CANCEL_REQUESTED, "🛑 SESSION: Cancellation requested");
        self.sessions.cancel(id)
    }

    /// Current state of a session that has not been delivered yet
    pub fn session_state(&self, id: SessionId) -> Option<SessionState> {
        self.sessions.state_of(id)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn open_session(
        &self,
        payload: &SchedulingRequestPayload,
    ) -> Result<(SessionEntry, watch::Receiver<bool>)> {
        let request = validate_request(payload).map_err(|error| {
            warn!(title = %payload.title, error = %error, "Rejected scheduling request");
            error
        })?;
        let session = Session::new(SessionId::new(), Arc::new(request));
        info!(
            session_id = %session.id(),
            title = %session.request().title(),
            participants = session.request().participants().len(),
            event = events::SESSION_CREATED,
            "🆕 SESSION: Created"
        );
        Ok(self.sessions.register(session))
    }

    async fn run_session(&self, entry: SessionEntry, cancel: watch::Receiver<bool>) -> SessionResponse {
        let session = Arc::clone(entry.session());
        let (id, request) = {
            let guard = session.read();
            (guard.id(), Arc::clone(guard.request()))
        };
        let started = Instant::now();
        let mut run = SessionRun {
            id,
            session,
            request,
            cancel,
            started,
            deadline: started + self.config.session.timeout(),
            progress: None,
        };

        if let Err(error) = self.drive(&mut run).await {
            log_error("orchestrator", "drive_session", &error.to_string(), Some(&id.to_string()));
            let mut session = run.session.write();
            if !session.is_terminal() {
                let cause = FailureCause::Internal {
                    reason: error.to_string(),
                };
                if let Err(close_error) = session.apply(SessionEvent::Fail(cause)) {
                    log_error("orchestrator", "close_session", &close_error.to_string(), Some(&id.to_string()));
                }
            }
        }

        let response = run.session.read().to_response();
        self.sessions.remove(id);
        info!(
            session_id = %id,
            outcome = %response.outcome,
            is_mock = response.is_mock,
            elapsed_ms = millis(run.started.elapsed()),
            event = events::SESSION_DELIVERED,
            "📬 SESSION: Delivered"
        );
        response
    }

    async fn drive(&self, run: &mut SessionRun) -> Result<()> {
        if let Some(reason) = self.limit_violation(&run.request) {
            return run.fail(FailureCause::InvalidInput { reason });
        }
        run.apply(SessionEvent::Validated)?;

        let availability = match self.resolve_phase(run).await? {
            PhaseOutcome::Continue(availability) => availability,
            PhaseOutcome::Settled => return Ok(()),
            PhaseOutcome::Failed(cause) => return run.fail(cause),
        };

        let candidates = match self.select_phase(run, &availability)? {
            PhaseOutcome::Continue(candidates) => candidates,
            PhaseOutcome::Settled => return Ok(()),
            PhaseOutcome::Failed(cause) => return run.fail(cause),
        };

        match self.booking_phase(run, candidates).await? {
            PhaseOutcome::Continue(()) | PhaseOutcome::Settled => Ok(()),
            PhaseOutcome::Failed(cause) => run.fail(cause),
        }
    }

    /// Session-level limits checked before any collaborator is called
    fn limit_violation(&self, request: &SchedulingRequest) -> Option<String> {
        let limits = &self.config.scheduling;
        if request.duration_minutes() > limits.max_duration_minutes {
            return Some(format!(
                "duration {}m exceeds the limit of {}m",
                request.duration_minutes(),
                limits.max_duration_minutes
            ));
        }
        if request.participants().len() > limits.max_participants {
            return Some(format!(
                "{} participants exceed the limit of {}",
                request.participants().len(),
                limits.max_participants
            ));
        }
        None
    }

    async fn resolve_phase(&self, run: &mut SessionRun) -> Result<PhaseOutcome<AvailabilityMap>> {
        let hop = Hop::Availability;
        let policy = self.config.policies.for_hop(hop).clone();
        let max_attempts = policy.max_attempts();
        let window = self.selector.search_window(&run.request);
        let mut attempts = 0;
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            if let Some(cause) = run.interruption() {
                return Ok(PhaseOutcome::Failed(cause));
            }
            if let Err(cause) = run.charge_call(self.config.session.max_total_attempts) {
                return Ok(PhaseOutcome::Failed(cause));
            }
            attempts = attempt;
            run.enter_call(hop, attempt);

            let request = AvailabilityRequest {
                session_id: run.id,
                participants: run.request.participants().to_vec(),
                window,
                timeout_ms: millis(policy.timeout().min(run.remaining())),
            };
            log_hop_attempt(run.id, hop, attempt, max_attempts, "started", None);

            let deadline = run.deadline;
            let race = tokio::select! {
                biased;
                _ = wait_cancelled(&mut run.cancel) => Race::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Race::TimedOut,
                reply = self.dispatch(AgentMessage::AvailabilityRequest(request)) => Race::Done(reply),
            };
            let reply = match race {
                Race::Cancelled => return Ok(PhaseOutcome::Failed(run.cancelled_cause())),
                Race::TimedOut => return Ok(PhaseOutcome::Failed(run.timeout_cause())),
                Race::Done(reply) => reply,
            };

            match reply {
                Ok(AgentMessage::AvailabilityResponse(response)) => {
                    log_hop_attempt(run.id, hop, attempt, max_attempts, "succeeded", None);
                    let records = self.record_availability(run, response.records, false)?;
                    return Ok(PhaseOutcome::Continue(records));
                }
                Ok(other) => {
                    return Err(AgendaError::StateTransition(format!(
                        "unexpected {} reply on the availability hop",
                        other.kind()
                    )))
                }
                Err(error) => {
                    let context = ErrorContext {
                        session_id: run.id,
                        hop,
                        attempt_number: attempt,
                        max_attempts,
                        remaining_budget: run.remaining(),
                    };
                    let classification = self.classifier.classify_error(&error, &context);
                    log_hop_attempt(
                        run.id,
                        hop,
                        attempt,
                        max_attempts,
                        "failed",
                        Some(&classification.error_message),
                    );
                    if classification.error_category != ErrorCategory::Transient {
                        return Err(error);
                    }
                    last_reason = error.to_string();
                    if !classification.is_retryable {
                        break;
                    }

                    let delay = classification.retry_delay.unwrap_or_default();
                    debug!(
                        session_id = %run.id,
                        delay_ms = millis(delay),
                        event = events::HOP_RETRY_SCHEDULED,
                        "Availability retry scheduled"
                    );
                    run.apply(SessionEvent::ResolverRetry {
                        attempt,
                        reason: last_reason.clone(),
                    })?;
                    if let Some(cause) = run.backoff(delay).await {
                        return Ok(PhaseOutcome::Failed(cause));
                    }
                }
            }
        }

        warn!(
            session_id = %run.id,
            hop = %hop,
            attempts = attempts,
            fallback = ?policy.fallback,
            event = events::HOP_EXHAUSTED,
            "Availability retries exhausted"
        );
        match policy.fallback {
            FallbackAction::Degrade => {
                let records = run
                    .request
                    .participants()
                    .iter()
                    .map(|participant| {
                        let record = AvailabilityRecord::unknown(
                            participant.clone(),
                            format!("availability degraded: {last_reason}"),
                        );
                        (participant.clone(), record)
                    })
                    .collect();
                let records = self.record_availability(run, records, true)?;
                Ok(PhaseOutcome::Continue(records))
            }
            FallbackAction::Fail | FallbackAction::MockBooking => {
                Ok(PhaseOutcome::Failed(FailureCause::RetryBudgetExhausted {
                    hop,
                    attempts,
                    reason: last_reason,
                }))
            }
        }
    }

    fn record_availability(
        &self,
        run: &SessionRun,
        records: AvailabilityMap,
        degraded: bool,
    ) -> Result<AvailabilityMap> {
        let known = records
            .values()
            .filter(|record| record.status == AvailabilityStatus::Known)
            .count();
        let uncertain = records.len() - known;
        run.session.write().set_availability(records.clone());
        run.apply(SessionEvent::AvailabilityResolved {
            known,
            uncertain,
            degraded,
        })?;
        Ok(records)
    }

    fn select_phase(
        &self,
        run: &SessionRun,
        availability: &AvailabilityMap,
    ) -> Result<PhaseOutcome<Vec<CandidateSlot>>> {
        if let Some(cause) = run.interruption() {
            return Ok(PhaseOutcome::Failed(cause));
        }

        let candidates = self.selector.select(&run.request, availability);
        if candidates.is_empty() {
            let alternatives = self.selector.suggest_alternatives(&run.request, availability);
            let count = alternatives.len();
            run.session.write().set_alternatives(alternatives);
            run.apply(SessionEvent::NoCandidates {
                alternatives: count,
            })?;
            return Ok(PhaseOutcome::Settled);
        }

        let count = candidates.len();
        run.session.write().set_candidates(candidates.clone());
        run.apply(SessionEvent::CandidatesRanked { count })?;
        Ok(PhaseOutcome::Continue(candidates))
    }

    async fn booking_phase(
        &self,
        run: &mut SessionRun,
        candidates: Vec<CandidateSlot>,
    ) -> Result<PhaseOutcome<()>> {
        let hop = Hop::Booking;
        let policy = self.config.policies.for_hop(hop).clone();
        let max_attempts = policy.max_attempts();

        for candidate in &candidates {
            let mut calls = 0;
            loop {
                if let Some(cause) = run.interruption() {
                    if calls > 0 {
                        run.record(candidate, calls, AttemptResult::Abandoned { reason: cause.to_string() });
                    }
                    return Ok(PhaseOutcome::Failed(cause));
                }
                if let Err(cause) = run.charge_call(self.config.session.max_total_attempts) {
                    if calls > 0 {
                        run.record(candidate, calls, AttemptResult::Abandoned { reason: cause.to_string() });
                    }
                    return Ok(PhaseOutcome::Failed(cause));
                }
                calls += 1;
                run.enter_call(hop, calls);

                let request = BookingRequest::for_slot(
                    run.id,
                    &run.request,
                    candidate.slot,
                    policy.timeout().min(run.remaining()),
                );
                log_hop_attempt(run.id, hop, calls, max_attempts, "started", Some(&candidate.slot.to_string()));

                // An in-flight booking is never abandoned; its own timeout bounds it
                let response = match self.dispatch(AgentMessage::BookingRequest(request.clone())).await? {
                    AgentMessage::BookingResponse(response) => response,
                    other => {
                        return Err(AgendaError::StateTransition(format!(
                            "unexpected {} reply on the booking hop",
                            other.kind()
                        )))
                    }
                };
                log_hop_attempt(run.id, hop, calls, max_attempts, response.result.label(), None);

                match response.result {
                    BookingResult::Confirmed { event_id } => {
                        run.commit(self.coordinator.confirmation(&request, event_id.clone()))?;
                        run.record(candidate, calls, AttemptResult::Confirmed { event_id });
                        return Ok(PhaseOutcome::Settled);
                    }
                    BookingResult::Conflict { reason } => {
                        run.record(candidate, calls, AttemptResult::Conflict { reason: reason.clone() });
                        run.apply(SessionEvent::BookingConflict {
                            slot: candidate.slot,
                            reason,
                        })?;
                        break;
                    }
                    BookingResult::Unavailable { reason } => {
                        if let Some(cause) = run.interruption() {
                            run.record(candidate, calls, AttemptResult::Abandoned { reason });
                            return Ok(PhaseOutcome::Failed(cause));
                        }

                        let error = AgendaError::TransientBackend {
                            hop,
                            reason: reason.clone(),
                        };
                        let context = ErrorContext {
                            session_id: run.id,
                            hop,
                            attempt_number: calls,
                            max_attempts,
                            remaining_budget: run.remaining(),
                        };
                        let classification = self.classifier.classify_error(&error, &context);
                        if classification.is_retryable {
                            let delay = classification.retry_delay.unwrap_or_default();
                            run.apply(SessionEvent::BookingRetry {
                                slot: candidate.slot,
                                attempt: calls,
                                reason: reason.clone(),
                            })?;
                            if let Some(cause) = run.backoff(delay).await {
                                run.record(candidate, calls, AttemptResult::Abandoned { reason });
                                return Ok(PhaseOutcome::Failed(cause));
                            }
                            continue;
                        }

                        return self.booking_fallback(run, candidate, &request, calls, reason, policy.fallback);
                    }
                }
            }
        }

        let (attempted, availability) = {
            let session = run.session.read();
            (session.attempts().len(), session.availability().clone())
        };
        let alternatives = self.selector.suggest_alternatives(&run.request, &availability);
        run.session.write().set_alternatives(alternatives);
        run.apply(SessionEvent::CandidatesExhausted { attempted })?;
        Ok(PhaseOutcome::Settled)
    }

    fn booking_fallback(
        &self,
        run: &SessionRun,
        candidate: &CandidateSlot,
        request: &BookingRequest,
        calls: u32,
        reason: String,
        fallback: FallbackAction,
    ) -> Result<PhaseOutcome<()>> {
        warn!(
            session_id = %run.id,
            slot = %candidate.slot,
            calls = calls,
            fallback = ?fallback,
            event = events::HOP_EXHAUSTED,
            "Booking retries exhausted"
        );
        match fallback {
            FallbackAction::MockBooking => {
                let confirmation = self.coordinator.fallback_booking(request);
                let event_id = confirmation.event_id.clone();
                info!(session_id = %run.id, event = events::BOOKING_FALLBACK, "Committing mock booking");
                run.commit(confirmation)?;
                run.record(candidate, calls, AttemptResult::ConfirmedMock { event_id });
                Ok(PhaseOutcome::Settled)
            }
            FallbackAction::Fail | FallbackAction::Degrade => {
                run.record(candidate, calls, AttemptResult::Unavailable { reason: reason.clone() });
                Ok(PhaseOutcome::Failed(FailureCause::RetryBudgetExhausted {
                    hop: Hop::Booking,
                    attempts: calls,
                    reason,
                }))
            }
        }
    }

    /// Route one outbound agent message to the component that handles it
    async fn dispatch(&self, message: AgentMessage) -> Result<AgentMessage> {
        let kind = message.kind();
        log_agent_message(message.session_id(), kind, "outbound", Some(&message.summary()));

        let reply = match message {
            AgentMessage::AvailabilityRequest(request) => {
                AgentMessage::AvailabilityResponse(self.resolver.resolve(&request).await?)
            }
            AgentMessage::BookingRequest(request) => {
                AgentMessage::BookingResponse(self.coordinator.book(&request).await)
            }
            AgentMessage::AvailabilityResponse(_) | AgentMessage::BookingResponse(_) => {
                return Err(AgendaError::StateTransition(format!(
                    "{kind} cannot be dispatched"
                )))
            }
        };

        log_agent_message(reply.session_id(), reply.kind(), "inbound", Some(&reply.summary()));
        Ok(reply)
    }
}
