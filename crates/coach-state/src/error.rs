//! Error types for state construction
//!
//! Every variant is client-caused: the request is rejected before any
//! generation call is made.

use coach_adaptive::AdaptiveError;

/// Request validation errors
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Workflow type outside the supported set
    #[error("unknown workflow type: '{0}'")]
    UnknownWorkflow(String),

    /// Difficulty label outside `easy|medium|hard`
    #[error("invalid difficulty: {0}")]
    InvalidDifficulty(#[source] AdaptiveError),

    /// Pre-seeded record could not be coerced
    #[error("invalid {field}: {reason}")]
    InvalidRecord {
        /// Payload field name
        field: &'static str,
        /// What went wrong
        reason: String,
    },

    /// `student_history` is not a sequence of records
    #[error("student_history must be a JSON array of session records: {0}")]
    InvalidHistory(#[source] AdaptiveError),

    /// Required field missing for the selected workflow
    #[error("{field} is required for {workflow} workflow")]
    MissingField {
        /// Missing payload field
        field: &'static str,
        /// Workflow that requires it
        workflow: &'static str,
    },

    /// State could not be encoded for the response
    #[error("failed to encode state: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StateError {
    /// Create invalid record error
    pub fn invalid_record(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display() {
        let err = StateError::MissingField {
            field: "problem",
            workflow: "analysis_only",
        };
        assert_eq!(
            err.to_string(),
            "problem is required for analysis_only workflow"
        );
    }

    #[test]
    fn invalid_record_display() {
        let err = StateError::invalid_record("student_attempt", "expected JSON object");
        assert!(err.to_string().contains("student_attempt"));
    }
}
