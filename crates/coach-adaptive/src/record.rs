//! Session history records
//!
//! One [`SessionRecord`] per past session. Histories are supplied by the
//! caller, either as structured records or as a JSON-encoded array.

use crate::error::AdaptiveError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One historical performance entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Consistency score of the session (0.0 - 1.0)
    #[serde(default)]
    pub consistency_score: f64,
    /// Explicit correctness, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    /// Consistency validation output for the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_results: Option<ConsistencyResults>,
}

impl SessionRecord {
    /// Create record with a consistency score
    #[inline]
    #[must_use]
    pub fn new(consistency_score: f64) -> Self {
        Self {
            consistency_score,
            ..Self::default()
        }
    }

    /// With explicit correctness
    #[inline]
    #[must_use]
    pub fn with_correct(mut self, is_correct: bool) -> Self {
        self.is_correct = Some(is_correct);
        self
    }

    /// With major inconsistencies reported by validation
    #[must_use]
    pub fn with_major_inconsistencies(mut self, inconsistencies: Vec<Value>) -> Self {
        self.consistency_results = Some(ConsistencyResults {
            major_inconsistencies: inconsistencies,
        });
        self
    }

    /// Whether validation reported any major inconsistency
    #[inline]
    #[must_use]
    pub fn has_major_inconsistencies(&self) -> bool {
        self.consistency_results
            .as_ref()
            .is_some_and(|r| !r.major_inconsistencies.is_empty())
    }
}

/// Subset of a consistency report kept in history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyResults {
    /// Major inconsistencies detected
    #[serde(default)]
    pub major_inconsistencies: Vec<Value>,
}

/// History as it arrives on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryInput {
    /// Structured records
    Records(Vec<SessionRecord>),
    /// JSON-encoded array of records
    Encoded(String),
}

impl HistoryInput {
    /// Resolve into structured records
    ///
    /// # Errors
    /// Returns [`AdaptiveError`] if encoded text is not a JSON array of records.
    pub fn into_records(self) -> Result<Vec<SessionRecord>, AdaptiveError> {
        match self {
            Self::Records(records) => Ok(records),
            Self::Encoded(text) => parse_history(&text),
        }
    }
}

/// Parse a JSON-encoded history
///
/// # Errors
/// [`AdaptiveError::MalformedHistory`] for invalid JSON or records,
/// [`AdaptiveError::HistoryNotSequence`] if the JSON is not an array.
pub fn parse_history(text: &str) -> Result<Vec<SessionRecord>, AdaptiveError> {
    let value: Value = serde_json::from_str(text)?;
    history_from_value(value)
}

/// Convert an already-parsed JSON value into records
///
/// # Errors
/// Same as [`parse_history`].
pub fn history_from_value(value: Value) -> Result<Vec<SessionRecord>, AdaptiveError> {
    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        _ => Err(AdaptiveError::HistoryNotSequence),
    }
}
