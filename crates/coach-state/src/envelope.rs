//! Response shaping
//!
//! [`sanitize`] renders a state for callers that want the raw session,
//! [`format_workflow_results`] builds the workflow response envelope.

use crate::error::StateError;
use crate::state::{SessionState, StateField};
use crate::workflow::{CurrentStep, WorkflowType};
use coach_adaptive::DifficultyLevel;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Workflow response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    /// Workflow that ran
    pub workflow_type: WorkflowType,
    /// Furthest step reached
    pub current_step: CurrentStep,
    /// Populated stage outputs keyed by external name
    pub results: IndexMap<String, Value>,
    /// Request parameters echoed back
    pub metadata: ResponseMetadata,
}

/// Request parameters echoed in the envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Grade level
    pub grade_level: String,
    /// Difficulty
    pub difficulty: DifficultyLevel,
    /// Disability
    pub disability: String,
}

/// Render a state as a JSON object without nulls or empty metadata
///
/// The input is left untouched.
///
/// # Errors
/// [`StateError::Encoding`] if the state cannot be encoded.
pub fn sanitize(state: &SessionState) -> Result<Map<String, Value>, StateError> {
    let Value::Object(mut map) = serde_json::to_value(state)? else {
        return Ok(Map::new());
    };

    map.retain(|key, value| match value {
        Value::Null => false,
        Value::Object(inner) if key == "metadata" => !inner.is_empty(),
        _ => true,
    });
    Ok(map)
}

/// Build the response envelope for a finished workflow
///
/// # Errors
/// [`StateError::Encoding`] if a stage output cannot be encoded.
pub fn format_workflow_results(
    state: &SessionState,
    workflow_type: WorkflowType,
    current_step: CurrentStep,
) -> Result<WorkflowResponse, StateError> {
    let mut results = IndexMap::new();
    for field in StateField::ALL {
        if !state.is_populated(field) {
            continue;
        }
        let value = match field {
            StateField::Problem => serde_json::to_value(&state.problem)?,
            StateField::StudentAttempt => serde_json::to_value(&state.student_attempt)?,
            StateField::ThoughtAnalysis => serde_json::to_value(&state.thought_analysis)?,
            StateField::Strategies => serde_json::to_value(&state.strategies)?,
            StateField::TutorSession => serde_json::to_value(&state.tutor_session)?,
            StateField::ConsistencyReport => serde_json::to_value(&state.consistency_report)?,
            StateField::AdaptivePlan => serde_json::to_value(&state.adaptive_plan)?,
            StateField::DisabilityAnalysis => serde_json::to_value(&state.disability_analysis)?,
        };
        results.insert(field.external_name().to_string(), value);
    }

    Ok(WorkflowResponse {
        workflow_type,
        current_step,
        results,
        metadata: ResponseMetadata {
            grade_level: state.grade_level.clone(),
            difficulty: state.difficulty,
            disability: state.disability.clone(),
        },
    })
}

/// Furthest step reflected by the populated fields
#[must_use]
pub fn derive_current_step(state: &SessionState) -> CurrentStep {
    const PRIORITY: [(StateField, CurrentStep); 8] = [
        (StateField::DisabilityAnalysis, CurrentStep::Completed),
        (StateField::AdaptivePlan, CurrentStep::Completed),
        (StateField::ConsistencyReport, CurrentStep::ConsistencyValidated),
        (StateField::TutorSession, CurrentStep::TutorSimulated),
        (StateField::Strategies, CurrentStep::StrategiesGenerated),
        (StateField::ThoughtAnalysis, CurrentStep::ThoughtAnalyzed),
        (StateField::StudentAttempt, CurrentStep::StudentSimulated),
        (StateField::Problem, CurrentStep::ProblemGenerated),
    ];

    PRIORITY
        .into_iter()
        .find(|(field, _)| state.is_populated(*field))
        .map_or(CurrentStep::Initialized, |(_, step)| step)
}
