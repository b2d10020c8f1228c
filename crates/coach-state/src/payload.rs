//! Request payload as received from callers

use crate::error::StateError;
use crate::workflow::WorkflowType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Loosely-typed request body
///
/// Every field is optional; [`crate::build_initial_state`] applies defaults
/// and coercions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// Grade level, defaults to `7th`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    /// `easy|medium|hard`, defaults to `medium`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    /// Disability, defaults to `Dyslexia`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disability: Option<String>,
    /// Workflow variant, defaults to `full`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<String>,
    /// Problem record or free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<Value>,
    /// Attempt record or JSON-object string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_attempt: Option<Value>,
    /// History records or JSON-encoded array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_history: Option<Value>,
    /// Free-text response for disability identification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_response: Option<String>,
    /// Pre-seeded thought analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_analysis: Option<Value>,
    /// Pre-seeded strategies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategies: Option<Value>,
    /// Pre-seeded tutor session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_session: Option<Value>,
    /// Pre-seeded consistency report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_report: Option<Value>,
    /// Pre-seeded adaptive plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptive_plan: Option<Value>,
    /// Pre-seeded disability analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disability_analysis: Option<Value>,
    /// Caller metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl SessionPayload {
    /// Create empty payload
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With workflow type label
    #[inline]
    #[must_use]
    pub fn with_workflow_type(mut self, workflow_type: impl Into<String>) -> Self {
        self.workflow_type = Some(workflow_type.into());
        self
    }

    /// With problem (record or text)
    #[inline]
    #[must_use]
    pub fn with_problem(mut self, problem: Value) -> Self {
        self.problem = Some(problem);
        self
    }

    /// With student attempt
    #[inline]
    #[must_use]
    pub fn with_student_attempt(mut self, attempt: Value) -> Self {
        self.student_attempt = Some(attempt);
        self
    }

    /// With student history
    #[inline]
    #[must_use]
    pub fn with_student_history(mut self, history: Value) -> Self {
        self.student_history = Some(history);
        self
    }

    /// With student response
    #[inline]
    #[must_use]
    pub fn with_student_response(mut self, response: impl Into<String>) -> Self {
        self.student_response = Some(response.into());
        self
    }

    /// With difficulty label
    #[inline]
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    /// With disability
    #[inline]
    #[must_use]
    pub fn with_disability(mut self, disability: impl Into<String>) -> Self {
        self.disability = Some(disability.into());
        self
    }

    /// With a caller metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Workflow label from the payload or its metadata
    #[must_use]
    pub fn workflow_label(&self) -> Option<&str> {
        self.workflow_type.as_deref().or_else(|| {
            self.metadata
                .as_ref()
                .and_then(|m| m.get("workflow_type"))
                .and_then(Value::as_str)
        })
    }

    /// Resolve the workflow variant, `full` if unspecified
    ///
    /// # Errors
    /// [`StateError::UnknownWorkflow`] for unsupported labels.
    pub fn resolve_workflow(&self) -> Result<WorkflowType, StateError> {
        self.workflow_label()
            .map_or(Ok(WorkflowType::Full), |label| label.parse())
    }

    /// Reject payloads that cannot run the analysis workflow
    ///
    /// # Errors
    /// [`StateError::MissingField`] if `problem` or `student_attempt` is
    /// missing or empty.
    pub fn require_analysis_inputs(&self) -> Result<(), StateError> {
        const WORKFLOW: &str = "analysis_only";
        if !is_present(self.problem.as_ref()) {
            return Err(StateError::MissingField {
                field: "problem",
                workflow: WORKFLOW,
            });
        }
        if !is_present(self.student_attempt.as_ref()) {
            return Err(StateError::MissingField {
                field: "student_attempt",
                workflow: WORKFLOW,
            });
        }
        Ok(())
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}
