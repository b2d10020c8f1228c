//! Stage output records
//!
//! Records the pipeline reads from are typed ([`Problem`], [`StudentAttempt`],
//! [`ThoughtAnalysis`]); unknown keys are preserved in `extra`. Records that
//! are only passed through use [`StageRecord`].

use crate::error::StateError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Generated (or caller-provided) math problem
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Problem statement
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub problem: Option<String>,
    /// Expected final answer (text or number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    /// Worked solution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<Value>,
    /// Grade level the problem targets
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub grade_level: Option<String>,
    /// Math concepts covered
    #[serde(
        default,
        deserialize_with = "lenient::strings",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub concepts: Vec<String>,
    /// Difficulty label echoed by the generator
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub difficulty: Option<String>,
    /// Any other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Problem {
    /// Wrap free text as a problem record
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            problem: Some(text.into()),
            ..Self::default()
        }
    }

    /// Non-empty problem statement
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.problem.as_deref().filter(|t| !t.is_empty())
    }

    /// Expected answer rendered as text, empty when unknown
    #[must_use]
    pub fn expected_answer(&self) -> String {
        match &self.answer {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// No field carries a value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.problem.is_none()
            && self.answer.is_none()
            && self.solution.is_none()
            && self.grade_level.is_none()
            && self.concepts.is_empty()
            && self.difficulty.is_none()
            && self.extra.is_empty()
    }
}

/// Simulated student attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentAttempt {
    /// Think-aloud narrative
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub thoughtprocess: Option<String>,
    /// Steps the student took
    #[serde(
        default,
        deserialize_with = "lenient::strings",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub steps_to_solve: Vec<String>,
    /// How the disability shaped the attempt
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub disability_impact: Option<String>,
    /// Any other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StudentAttempt {
    /// No field carries a value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.thoughtprocess.is_none()
            && self.steps_to_solve.is_empty()
            && self.disability_impact.is_none()
            && self.extra.is_empty()
    }
}

/// Classification of the main mistake
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MistakeAnalysis {
    /// conceptual / procedural / operational / interpretive / attention
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    /// mild / moderate / severe
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<String>,
    /// isolated / pattern / common
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub frequency: Option<String>,
    /// Any other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Analysis of the student's thinking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThoughtAnalysis {
    /// Narrative analysis
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub thought: Option<String>,
    /// Mistake classification
    #[serde(
        default,
        deserialize_with = "lenient::mistake",
        skip_serializing_if = "Option::is_none"
    )]
    pub mistake_analysis: Option<MistakeAnalysis>,
    /// Ways the disability influenced the attempt
    #[serde(
        default,
        deserialize_with = "lenient::strings",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub disability_connections: Vec<String>,
    /// Learning needs and strengths
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub learning_implications: Option<String>,
    /// Any other keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ThoughtAnalysis {
    /// No field carries a value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.thought.is_none()
            && self.mistake_analysis.is_none()
            && self.disability_connections.is_empty()
            && self.learning_implications.is_none()
            && self.extra.is_empty()
    }
}

/// Opaque structured record (strategies, tutor session, reports, plans)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageRecord(pub Map<String, Value>);

impl StageRecord {
    /// Build from any serializable value that encodes as an object
    ///
    /// # Errors
    /// Returns [`StateError`] if the value does not encode as a JSON object.
    pub fn from_serializable<T: Serialize>(
        field: &'static str,
        value: &T,
    ) -> Result<Self, StateError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StateError::invalid_record(
                field,
                format!("expected object, got {}", json_kind(&other)),
            )),
        }
    }

    /// Field lookup
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// No keys present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Coerce a caller-provided value into a structured record
///
/// Accepts a JSON object, or a string holding a JSON object. Blank strings
/// coerce to an empty record.
///
/// # Errors
/// Returns [`StateError::InvalidRecord`] when coercion is impossible.
pub fn coerce_record<T: DeserializeOwned>(
    field: &'static str,
    value: Value,
) -> Result<T, StateError> {
    let object = match value {
        Value::Object(map) => map,
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(text) {
                    Ok(Value::Object(map)) => map,
                    Ok(other) => {
                        return Err(StateError::invalid_record(
                            field,
                            format!("expected JSON object after parsing, got {}", json_kind(&other)),
                        ))
                    }
                    Err(e) => {
                        return Err(StateError::invalid_record(
                            field,
                            format!("expected JSON object string: {e}"),
                        ))
                    }
                }
            }
        }
        other => {
            return Err(StateError::invalid_record(
                field,
                format!(
                    "expected object or JSON object string, got {}",
                    json_kind(&other)
                ),
            ))
        }
    };

    serde_json::from_value(Value::Object(object))
        .map_err(|e| StateError::invalid_record(field, e.to_string()))
}

/// Field deserializers for loosely typed model output
///
/// Nulls read as absent; scalars or nested values where text is expected are
/// kept as their compact JSON rendering.
mod lenient {
    use super::MistakeAnalysis;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::{Map, Value};

    fn into_text(value: Value) -> String {
        match value {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    pub(super) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => None,
            other => Some(into_text(other)),
        })
    }

    pub(super) fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(into_text)
                .collect(),
            other => vec![into_text(other)],
        })
    }

    /// A bare description lands under `summary`
    pub(super) fn mistake<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<MistakeAnalysis>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::Object(map) => serde_json::from_value(Value::Object(map))
                .map(Some)
                .map_err(D::Error::custom),
            other => {
                let mut extra = Map::new();
                extra.insert("summary".to_string(), other);
                Ok(Some(MistakeAnalysis {
                    extra,
                    ..MistakeAnalysis::default()
                }))
            }
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
