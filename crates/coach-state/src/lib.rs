//! Session State
//!
//! Per-request state for the tutoring pipeline: the typed [`SessionState`],
//! the payload it is built from, and the shapes it is returned in.
//!
//! # Lifecycle
//!
//! 1. [`build_initial_state`] turns a [`SessionPayload`] into a state,
//!    rejecting client mistakes with [`StateError`].
//! 2. The pipeline fills fields through [`SessionState::merge`], which
//!    never overwrites a populated field.
//! 3. [`format_workflow_results`] or [`sanitize`] renders the result.
//!
//! # Example
//!
//! ```rust
//! use coach_state::{build_initial_state, derive_current_step, CurrentStep, SessionPayload};
//! use serde_json::json;
//!
//! let payload = SessionPayload::new().with_problem(json!("What is 12 / 4?"));
//! let state = build_initial_state(payload).unwrap();
//!
//! assert!(state.metadata.use_provided_problem);
//! assert_eq!(derive_current_step(&state), CurrentStep::ProblemGenerated);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod envelope;
pub mod error;
pub mod normalize;
pub mod payload;
pub mod records;
pub mod state;
pub mod workflow;

pub use envelope::{
    derive_current_step, format_workflow_results, sanitize, ResponseMetadata, WorkflowResponse,
};
pub use error::StateError;
pub use normalize::build_initial_state;
pub use payload::SessionPayload;
pub use records::{
    coerce_record, MistakeAnalysis, Problem, StageRecord, StudentAttempt, ThoughtAnalysis,
};
pub use state::{
    MergeOutcome, SessionMetadata, SessionState, StateField, StateUpdate, DEFAULT_DISABILITY,
    DEFAULT_GRADE_LEVEL,
};
pub use workflow::{CurrentStep, WorkflowType};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
