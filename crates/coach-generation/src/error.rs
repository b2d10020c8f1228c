//! Error types for stage generation

/// Errors raised while producing a stage payload
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// No handler registered for the stage
    #[error("stage '{0}' is not registered")]
    UnregisteredStage(String),

    /// Handler called with the wrong number of arguments
    #[error("stage '{stage}' expects {expected} arguments, got {actual}")]
    ArgumentCount {
        /// Stage name
        stage: &'static str,
        /// Declared arity
        expected: usize,
        /// Arguments supplied
        actual: usize,
    },

    /// Request to the backend failed in transit
    #[error("generation backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("generation backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Backend answered without any completion text
    #[error("generation backend returned no choices")]
    EmptyCompletion,

    /// Output is not a JSON object or array
    #[error("invalid payload from stage '{stage}': {detail}")]
    InvalidPayload {
        /// Stage name
        stage: String,
        /// What was wrong with it
        detail: String,
    },

    /// Backend credentials not configured
    #[error("missing credentials: {0} is not set")]
    MissingCredentials(&'static str),
}

impl GenerationError {
    /// Create invalid payload error
    pub fn invalid_payload(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidPayload {
            stage: stage.into(),
            detail: detail.into(),
        }
    }

    /// Failure may succeed if the caller tries again
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Caller named an unknown stage or passed the wrong arguments
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnregisteredStage(_) | Self::ArgumentCount { .. })
    }
}
