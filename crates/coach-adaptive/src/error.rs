//! Error types for the adaptive controller

/// Adaptive difficulty errors
#[derive(Debug, thiserror::Error)]
pub enum AdaptiveError {
    /// Difficulty label outside `easy|medium|hard`
    #[error("unknown difficulty level: '{0}'")]
    UnknownDifficulty(String),

    /// History text is not valid JSON
    #[error("student_history is not valid JSON: {0}")]
    MalformedHistory(#[from] serde_json::Error),

    /// History parsed, but not to a sequence
    #[error("student_history must be a JSON array")]
    HistoryNotSequence,
}
