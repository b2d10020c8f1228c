//! Coach Core - tutoring pipeline orchestration
//!
//! Sequences the generation stages over one session state and exposes the
//! workflow entry points:
//! - [`SessionOrchestrator`]: the fixed eight-node pipeline
//! - [`WorkflowService`]: `full`, `problem_only` and `analysis_only`
//!   workflows, the legacy session call and the adaptive-only entry point
//! - [`CoachConfig`]: layered configuration for the generation backend
//!
//! # Example
//!
//! ```rust,no_run
//! use coach_core::{CoachConfig, WorkflowService};
//! use coach_state::SessionPayload;
//!
//! # async fn example() -> Result<(), coach_core::OrchestratorError> {
//! let config = CoachConfig::load(None)?;
//! let service = WorkflowService::from_config(&config)?;
//!
//! let payload = SessionPayload::new().with_disability("ADHD");
//! let response = service.run_workflow(payload).await?;
//! println!("reached {}", response.current_step);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod service;

// Re-exports for convenience
pub use config::CoachConfig;
pub use error::{OrchestratorError, Result};
pub use orchestrator::{PipelineNode, SessionOrchestrator};
pub use service::WorkflowService;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running workflows
    pub use crate::{
        CoachConfig, OrchestratorError, PipelineNode, SessionOrchestrator, WorkflowService,
    };
    pub use coach_state::{SessionPayload, WorkflowResponse, WorkflowType};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
