#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Agenda Core Rust
//!
//! Negotiation and booking orchestration core for multi-agent meeting
//! scheduling.
//!
//! ## Overview
//!
//! A scheduling request names a title, a duration, participants, preferred
//! days and times and a timezone. The core turns it into either a booked
//! calendar event or a well-defined failure, surviving unreachable calendars,
//! slow participants and slot conflicts along the way.
//!
//! ## Architecture
//!
//! Components, leaf first:
//!
//! - **Availability Resolver**: busy intervals per participant, or an explicit `UNKNOWN`
//! - **Slot Selection Engine**: deterministic, ranked candidate slots
//! - **Booking Coordinator**: commits one slot, distinguishing confirmed, conflict and unavailable
//! - **Negotiation Orchestrator**: session state machine driving the three above
//!
//! ## Module Organization
//!
//! - [`models`] - Requests, time slots, availability, candidates and sessions
//! - [`validation`] - Request payload validation
//! - [`state_machine`] - Session lifecycle states, events and audit trail
//! - [`calendar`] - Calendar collaborator trait and in-memory backend
//! - [`messaging`] - Agent messages exchanged per hop
//! - [`resolver`], [`selection`], [`booking`] - The three leaf components
//! - [`orchestration`] - Orchestrator, hop policies and error classification
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agenda_core::calendar::InMemoryCalendar;
//! use agenda_core::config::AgendaConfig;
//! use agenda_core::models::SchedulingRequestPayload;
//! use agenda_core::orchestration::NegotiationOrchestrator;
//! use agenda_core::selection::SystemClock;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let calendar = Arc::new(InMemoryCalendar::new());
//! let orchestrator =
//!     NegotiationOrchestrator::new(AgendaConfig::default(), calendar, Arc::new(SystemClock))?;
//!
//! let response = orchestrator
//!     .negotiate(&SchedulingRequestPayload {
//!         title: "Quarterly planning".to_string(),
//!         description: None,
//!         duration_minutes: 60,
//!         participants: vec!["alice@example.com".to_string(), "bob@example.com".to_string()],
//!         preferred_days: vec!["Monday".to_string()],
//!         preferred_times: vec!["09:00".to_string(), "14:00".to_string()],
//!         timezone: "Europe/Berlin".to_string(),
//!     })
//!     .await?;
//!
//! println!("{}: {:?}", response.outcome, response.committed_slot);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod booking;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod resolver;
pub mod selection;
pub mod state_machine;
pub mod validation;

pub use booking::BookingCoordinator;
pub use calendar::{CalendarClient, CalendarError, InMemoryCalendar};
pub use config::{AgendaConfig, ConfigManager};
pub use constants::{status_groups, system};
// Re-export constants events with different name to avoid conflict
pub use constants::events as system_events;
pub use error::{AgendaError, Result};
pub use models::{
    AvailabilityRecord, AvailabilityStatus, CandidateSlot, ParticipantId, SchedulingRequest,
    SchedulingRequestPayload, SessionId, SessionResponse, TimeSlot,
};
pub use orchestration::{NegotiationOrchestrator, SessionHandle};
pub use resolver::AvailabilityResolver;
pub use selection::{Clock, FixedClock, SlotSelectionEngine, SystemClock};
pub use state_machine::{SessionEvent, SessionState};
pub use validation::{validate_request, ValidationError};
