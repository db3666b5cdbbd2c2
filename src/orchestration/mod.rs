//! # Orchestration Engine
//!
//! Session-level coordination of the negotiation flow.
//!
//! ## Core Components
//!
//! - **NegotiationOrchestrator**: owns the session registry and drives each
//!   session through resolve, select and book
//! - **HopPolicyTable**: retry, backoff, timeout and fallback per hop
//! - **ErrorClassifier**: maps hop errors to retry decisions using the policy table
//! - **SessionRegistry**: in-flight sessions with per-session locks and cancellation

pub mod error_classifier;
pub mod negotiation_orchestrator;
pub mod policy;
pub mod session_registry;

// Re-export core types and components for easy access
pub use error_classifier::{
    ErrorCategory, ErrorClassification, ErrorClassifier, ErrorContext, StandardErrorClassifier,
};
pub use negotiation_orchestrator::{NegotiationOrchestrator, SessionHandle};
pub use policy::{BackoffPolicy, FallbackAction, Hop, HopPolicy, HopPolicyTable};
pub use session_registry::{SessionEntry, SessionRegistry};
