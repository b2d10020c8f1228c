//! Payload to state normalization

use crate::error::StateError;
use crate::payload::SessionPayload;
use crate::records::{coerce_record, Problem};
use crate::state::{SessionMetadata, SessionState, DEFAULT_DISABILITY, DEFAULT_GRADE_LEVEL};
use coach_adaptive::{history_from_value, parse_history, DifficultyLevel, SessionRecord};
use serde_json::Value;

/// Build the initial session state for a request
///
/// Applies defaults, resolves the workflow variant, wraps free-text problems,
/// coerces pre-seeded records and parses encoded histories. Fails before any
/// generation work is done.
///
/// # Errors
/// Returns [`StateError`] for any client-caused validation failure.
pub fn build_initial_state(payload: SessionPayload) -> Result<SessionState, StateError> {
    let workflow_type = payload.resolve_workflow()?;
    let difficulty = payload
        .difficulty
        .as_deref()
        .map(str::parse::<DifficultyLevel>)
        .transpose()
        .map_err(StateError::InvalidDifficulty)?
        .unwrap_or_default();

    let SessionPayload {
        grade_level,
        disability,
        problem,
        student_attempt,
        student_history,
        student_response,
        thought_analysis,
        strategies,
        tutor_session,
        consistency_report,
        adaptive_plan,
        disability_analysis,
        metadata,
        ..
    } = payload;

    let mut metadata = SessionMetadata::from_caller(metadata.unwrap_or_default());
    metadata.workflow_type = Some(workflow_type);

    let problem = match problem {
        Some(value) => {
            metadata.use_provided_problem = true;
            Some(problem_from_value(value)?)
        }
        None => None,
    };

    let student_attempt = match student_attempt {
        Some(value) => {
            metadata
                .student_attempt_source
                .get_or_insert_with(|| "provided".to_string());
            Some(coerce_record("student_attempt", value)?)
        }
        None => None,
    };

    let state = SessionState {
        grade_level: grade_level.unwrap_or_else(|| DEFAULT_GRADE_LEVEL.to_string()),
        difficulty,
        disability: disability.unwrap_or_else(|| DEFAULT_DISABILITY.to_string()),
        problem,
        student_attempt,
        thought_analysis: thought_analysis
            .map(|v| coerce_record("thought_analysis", v))
            .transpose()?,
        strategies: strategies
            .map(|v| coerce_record("strategies", v))
            .transpose()?,
        tutor_session: tutor_session
            .map(|v| coerce_record("tutor_session", v))
            .transpose()?,
        consistency_report: consistency_report
            .map(|v| coerce_record("consistency_report", v))
            .transpose()?,
        adaptive_plan: adaptive_plan
            .map(|v| coerce_record("adaptive_plan", v))
            .transpose()?,
        disability_analysis: disability_analysis
            .map(|v| coerce_record("disability_analysis", v))
            .transpose()?,
        student_history: student_history.map(history_from_payload).transpose()?,
        student_response,
        metadata,
    };

    tracing::debug!(
        workflow = %workflow_type,
        use_provided_problem = state.metadata.use_provided_problem,
        history_len = state.history().len(),
        "normalized session payload"
    );
    Ok(state)
}

fn problem_from_value(value: Value) -> Result<Problem, StateError> {
    match value {
        Value::Object(_) => coerce_record("problem", value),
        Value::String(text) => Ok(Problem::from_text(text.trim())),
        other => Ok(Problem::from_text(other.to_string())),
    }
}

fn history_from_payload(value: Value) -> Result<Vec<SessionRecord>, StateError> {
    match value {
        Value::String(text) => parse_history(&text),
        other => history_from_value(other),
    }
    .map_err(StateError::InvalidHistory)
}
