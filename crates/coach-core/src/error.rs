//! Error types for the orchestrator
//!
//! Failures fall into two classes:
//! - Client errors: the request was rejected before or during validation
//! - Server errors: a stage invocation failed and the pipeline was aborted

use coach_adaptive::AdaptiveError;
use coach_generation::GenerationError;
use coach_state::StateError;

/// Orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Request failed validation
    #[error("validation failed: {0}")]
    Validation(#[from] StateError),

    /// Adaptive-only request was malformed
    #[error("adaptive request invalid: {0}")]
    Adaptive(#[from] AdaptiveError),

    /// Node input requirements unmet
    #[error("{node} cannot run: {detail}")]
    Precondition {
        /// Pipeline node
        node: &'static str,
        /// Missing input
        detail: String,
    },

    /// Stage returned something other than a usable structured record
    #[error("invalid payload from {stage}: {detail}")]
    InvalidPayload {
        /// Stage name
        stage: &'static str,
        /// What was wrong with it
        detail: String,
    },

    /// Generation collaborator failed
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Stage input or output could not be encoded
    #[error("encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl OrchestratorError {
    /// Create precondition error
    pub fn precondition(node: &'static str, detail: impl Into<String>) -> Self {
        Self::Precondition {
            node,
            detail: detail.into(),
        }
    }

    /// Create invalid payload error
    pub fn invalid_payload(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidPayload {
            stage,
            detail: detail.into(),
        }
    }

    /// Caller must fix the request
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Validation(StateError::Encoding(_)) => false,
            Self::Validation(_) | Self::Adaptive(_) | Self::Precondition { .. } => true,
            _ => false,
        }
    }

    /// HTTP-style status for the failure class
    #[inline]
    #[must_use]
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }

    /// Transient failure a caller may retry
    ///
    /// Nothing in the pipeline retries on its own.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;
