//! Session orchestrator
//!
//! Runs the fixed eight-node pipeline over one [`SessionState`]:
//!
//! 1. `generate_problem`
//! 2. `simulate_attempt`
//! 3. `analyze_attempt`
//! 4. `teaching_strategies`
//! 5. `tutor_session`
//! 6. `consistency_validation`
//! 7. `adaptive_difficulty`
//! 8. `identify_disability`
//!
//! Nodes run strictly in order. Each one checks its own inputs and either
//! contributes a single field or nothing. The first failure aborts the run.

use crate::error::{OrchestratorError, Result};
use coach_adaptive::{AdaptiveController, DifficultyLevel};
use coach_generation::{GenerationClient, Invocation, Stage};
use coach_state::{
    MergeOutcome, Problem, SessionState, StageRecord, StateField, StateUpdate, StudentAttempt,
    ThoughtAnalysis,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;
use ulid::Ulid;

/// Pipeline node, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineNode {
    /// Generate the math problem
    GenerateProblem,
    /// Simulate the student attempt
    SimulateAttempt,
    /// Analyze the attempt
    AnalyzeAttempt,
    /// Derive teaching strategies
    TeachingStrategies,
    /// Simulate a tutoring dialogue
    TutorSession,
    /// Validate the attempt's internal consistency
    ConsistencyValidation,
    /// Recommend the next difficulty
    AdaptiveDifficulty,
    /// Classify a free-text student response
    IdentifyDisability,
}

impl PipelineNode {
    /// All nodes in execution order
    pub const ALL: [Self; 8] = [
        Self::GenerateProblem,
        Self::SimulateAttempt,
        Self::AnalyzeAttempt,
        Self::TeachingStrategies,
        Self::TutorSession,
        Self::ConsistencyValidation,
        Self::AdaptiveDifficulty,
        Self::IdentifyDisability,
    ];

    /// Node name, used as the `cache_status` key
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenerateProblem => "generate_problem",
            Self::SimulateAttempt => "simulate_attempt",
            Self::AnalyzeAttempt => "analyze_attempt",
            Self::TeachingStrategies => "teaching_strategies",
            Self::TutorSession => "tutor_session",
            Self::ConsistencyValidation => "consistency_validation",
            Self::AdaptiveDifficulty => "adaptive_difficulty",
            Self::IdentifyDisability => "identify_disability",
        }
    }

    /// Generation stage invoked, `None` for nodes computed locally
    #[must_use]
    pub fn stage(self) -> Option<Stage> {
        match self {
            Self::GenerateProblem => Some(Stage::GenerateProblem),
            Self::SimulateAttempt => Some(Stage::SimulateStudent),
            Self::AnalyzeAttempt => Some(Stage::AnalyzeThought),
            Self::TeachingStrategies => Some(Stage::TeachingStrategies),
            Self::TutorSession => Some(Stage::TutorSession),
            Self::ConsistencyValidation => Some(Stage::ConsistencyValidation),
            Self::AdaptiveDifficulty => None,
            Self::IdentifyDisability => Some(Stage::IdentifyDisability),
        }
    }

    /// State field the node fills
    #[must_use]
    pub fn output(self) -> StateField {
        match self {
            Self::GenerateProblem => StateField::Problem,
            Self::SimulateAttempt => StateField::StudentAttempt,
            Self::AnalyzeAttempt => StateField::ThoughtAnalysis,
            Self::TeachingStrategies => StateField::Strategies,
            Self::TutorSession => StateField::TutorSession,
            Self::ConsistencyValidation => StateField::ConsistencyReport,
            Self::AdaptiveDifficulty => StateField::AdaptivePlan,
            Self::IdentifyDisability => StateField::DisabilityAnalysis,
        }
    }
}

impl fmt::Display for PipelineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial update produced by one node
struct NodeOutput {
    update: StateUpdate,
    cache_hit: Option<bool>,
}

impl NodeOutput {
    fn invoked(update: StateUpdate, cache_hit: bool) -> Self {
        Self {
            update,
            cache_hit: Some(cache_hit),
        }
    }

    fn local(update: StateUpdate) -> Self {
        Self {
            update,
            cache_hit: None,
        }
    }
}

/// Why a node contributed nothing
#[derive(Debug, Clone, Copy)]
enum Skip {
    AlreadyPopulated,
    ProvidedProblem,
    MissingInputs,
}

impl Skip {
    fn reason(self) -> &'static str {
        match self {
            Self::AlreadyPopulated => "output already present",
            Self::ProvidedProblem => "caller provided the problem",
            Self::MissingInputs => "inputs not available",
        }
    }
}

type NodeResult = Result<std::result::Result<NodeOutput, Skip>>;

/// Drives the pipeline over a session state
///
/// The generation client and the adaptive controller are injected; the
/// orchestrator holds no per-request state and can be shared.
#[derive(Clone)]
pub struct SessionOrchestrator {
    client: Arc<dyn GenerationClient>,
    controller: AdaptiveController,
}

impl SessionOrchestrator {
    /// Create orchestrator over a generation client
    #[must_use]
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            controller: AdaptiveController::default(),
        }
    }

    /// With a custom adaptive controller
    #[inline]
    #[must_use]
    pub fn with_controller(mut self, controller: AdaptiveController) -> Self {
        self.controller = controller;
        self
    }

    /// Adaptive controller used by the `adaptive_difficulty` node
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &AdaptiveController {
        &self.controller
    }

    /// Run all eight nodes in order
    ///
    /// # Errors
    /// Returns the first node failure; later nodes do not run.
    pub async fn run_pipeline(&self, state: &mut SessionState) -> Result<()> {
        let workflow = state.workflow_type();
        let span = tracing::info_span!(
            "pipeline",
            session_id = %Ulid::new(),
            workflow = %workflow,
        );

        async {
            tracing::info!(
                grade_level = %state.grade_level,
                difficulty = %state.difficulty,
                disability = %state.disability,
                "pipeline started"
            );
            for node in PipelineNode::ALL {
                if let Err(e) = self.run_node(node, state).await {
                    tracing::error!(node = %node, error = %e, "pipeline aborted");
                    return Err(e);
                }
            }
            tracing::info!(
                invocations = state.metadata.cache_status.len(),
                "pipeline finished"
            );
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Run one node and merge its output
    ///
    /// Returns `true` if the node contributed a field.
    ///
    /// # Errors
    /// [`OrchestratorError::Precondition`] when the attempt cannot be
    /// simulated, [`OrchestratorError::InvalidPayload`] when a stage result is
    /// unusable, or the generation client's own error.
    pub async fn run_node(&self, node: PipelineNode, state: &mut SessionState) -> Result<bool> {
        let output = match node {
            PipelineNode::GenerateProblem => self.generate_problem_node(state).await?,
            PipelineNode::SimulateAttempt => self.simulate_attempt_node(state).await?,
            PipelineNode::AnalyzeAttempt => self.analyze_attempt_node(state).await?,
            PipelineNode::TeachingStrategies | PipelineNode::TutorSession => {
                self.guidance_node(node, state).await?
            }
            PipelineNode::ConsistencyValidation => self.consistency_node(state).await?,
            PipelineNode::AdaptiveDifficulty => self.adaptive_node(state)?,
            PipelineNode::IdentifyDisability => self.identify_node(state).await?,
        };

        match output {
            Ok(NodeOutput { update, cache_hit }) => {
                if let Some(hit) = cache_hit {
                    state.metadata.record_cache(node.as_str(), hit);
                }
                tracing::debug!(node = %node, cache_hit = ?cache_hit, "node completed");
                Ok(state.merge(update) == MergeOutcome::Applied)
            }
            Err(skip) => {
                tracing::debug!(node = %node, reason = skip.reason(), "node skipped");
                Ok(false)
            }
        }
    }

    /// Generate a problem outside the pipeline
    ///
    /// Returns the problem and whether it was served from cache.
    ///
    /// # Errors
    /// [`OrchestratorError::InvalidPayload`] if the result is not a non-empty
    /// object, or the generation client's own error.
    pub async fn generate_problem(
        &self,
        grade_level: &str,
        difficulty: DifficultyLevel,
        use_cache: bool,
    ) -> Result<(Problem, bool)> {
        let stage = Stage::GenerateProblem;
        let invocation = self
            .invoke(
                stage,
                vec![grade_level.to_string(), difficulty.as_str().to_string()],
                use_cache,
            )
            .await?;

        if invocation.payload.as_object().map_or(true, serde_json::Map::is_empty) {
            return Err(OrchestratorError::invalid_payload(
                stage.as_str(),
                "problem generation returned an empty payload",
            ));
        }
        let problem = into_record(stage, invocation.payload)?;
        Ok((problem, invocation.cache_hit))
    }

    async fn invoke(&self, stage: Stage, args: Vec<String>, use_cache: bool) -> Result<Invocation> {
        Ok(self.client.invoke(stage, args, use_cache).await?)
    }

    async fn generate_problem_node(&self, state: &SessionState) -> NodeResult {
        if state.metadata.use_provided_problem {
            return Ok(Err(Skip::ProvidedProblem));
        }
        if state.is_populated(StateField::Problem) {
            return Ok(Err(Skip::AlreadyPopulated));
        }

        let use_cache = !state.metadata.refresh_problem;
        let (problem, cache_hit) = self
            .generate_problem(&state.grade_level, state.difficulty, use_cache)
            .await?;
        Ok(Ok(NodeOutput::invoked(StateUpdate::Problem(problem), cache_hit)))
    }

    async fn simulate_attempt_node(&self, state: &SessionState) -> NodeResult {
        if state.is_populated(StateField::StudentAttempt) {
            return Ok(Err(Skip::AlreadyPopulated));
        }
        let Some(problem_text) = state.problem_text() else {
            return Err(OrchestratorError::precondition(
                PipelineNode::SimulateAttempt.as_str(),
                "problem text missing for attempt simulation",
            ));
        };

        let stage = Stage::SimulateStudent;
        let invocation = self
            .invoke(
                stage,
                vec![state.disability.clone(), problem_text.to_string()],
                true,
            )
            .await?;
        let attempt: StudentAttempt = into_record(stage, invocation.payload)?;
        Ok(Ok(NodeOutput::invoked(
            StateUpdate::StudentAttempt(attempt),
            invocation.cache_hit,
        )))
    }

    async fn analyze_attempt_node(&self, state: &SessionState) -> NodeResult {
        if state.is_populated(StateField::ThoughtAnalysis) {
            return Ok(Err(Skip::AlreadyPopulated));
        }
        let Some((problem, attempt)) = analysis_inputs(state) else {
            return Ok(Err(Skip::MissingInputs));
        };

        let stage = Stage::AnalyzeThought;
        let args = vec![
            state.disability.clone(),
            problem.text().unwrap_or_default().to_string(),
            serde_json::to_string(attempt)?,
        ];
        let invocation = self.invoke(stage, args, true).await?;
        let analysis: ThoughtAnalysis = into_record(stage, invocation.payload)?;
        Ok(Ok(NodeOutput::invoked(
            StateUpdate::ThoughtAnalysis(analysis),
            invocation.cache_hit,
        )))
    }

    /// Teaching strategies and tutor session share inputs
    async fn guidance_node(&self, node: PipelineNode, state: &SessionState) -> NodeResult {
        if state.is_populated(node.output()) {
            return Ok(Err(Skip::AlreadyPopulated));
        }
        let Some(thought) = state
            .thought_analysis
            .as_ref()
            .filter(|t| !t.is_empty())
        else {
            return Ok(Err(Skip::MissingInputs));
        };

        let (stage, wrap): (Stage, fn(StageRecord) -> StateUpdate) = match node {
            PipelineNode::TeachingStrategies => {
                (Stage::TeachingStrategies, StateUpdate::Strategies)
            }
            _ => (Stage::TutorSession, StateUpdate::TutorSession),
        };
        let attempt_json = match &state.student_attempt {
            Some(attempt) => serde_json::to_string(attempt)?,
            None => "{}".to_string(),
        };
        let args = vec![
            state.disability.clone(),
            state.problem_text().unwrap_or_default().to_string(),
            attempt_json,
            serde_json::to_string(thought)?,
        ];

        let invocation = self.invoke(stage, args, true).await?;
        let record: StageRecord = into_record(stage, invocation.payload)?;
        Ok(Ok(NodeOutput::invoked(wrap(record), invocation.cache_hit)))
    }

    async fn consistency_node(&self, state: &SessionState) -> NodeResult {
        if state.is_populated(StateField::ConsistencyReport) {
            return Ok(Err(Skip::AlreadyPopulated));
        }
        let Some((problem, attempt)) = analysis_inputs(state) else {
            return Ok(Err(Skip::MissingInputs));
        };

        let stage = Stage::ConsistencyValidation;
        let args = vec![
            problem.text().unwrap_or_default().to_string(),
            state.disability.clone(),
            serde_json::to_string(attempt)?,
            problem.expected_answer(),
        ];
        let invocation = self.invoke(stage, args, true).await?;
        let report: StageRecord = into_record(stage, invocation.payload)?;
        Ok(Ok(NodeOutput::invoked(
            StateUpdate::ConsistencyReport(report),
            invocation.cache_hit,
        )))
    }

    fn adaptive_node(&self, state: &SessionState) -> NodeResult {
        if state.is_populated(StateField::AdaptivePlan) {
            return Ok(Err(Skip::AlreadyPopulated));
        }
        let history = state.history();
        if history.is_empty() {
            return Ok(Err(Skip::MissingInputs));
        }

        let recommendation = self.controller.recommend(history, state.difficulty);
        let plan = StageRecord::from_serializable("adaptive_plan", &recommendation)?;
        Ok(Ok(NodeOutput::local(StateUpdate::AdaptivePlan(plan))))
    }

    async fn identify_node(&self, state: &SessionState) -> NodeResult {
        if state.is_populated(StateField::DisabilityAnalysis) {
            return Ok(Err(Skip::AlreadyPopulated));
        }
        let (Some(response), Some(problem_text)) = (state.student_response(), state.problem_text())
        else {
            return Ok(Err(Skip::MissingInputs));
        };

        let stage = Stage::IdentifyDisability;
        let args = vec![problem_text.to_string(), response.to_string()];
        let invocation = self.invoke(stage, args, true).await?;
        let analysis: StageRecord = into_record(stage, invocation.payload)?;
        Ok(Ok(NodeOutput::invoked(
            StateUpdate::DisabilityAnalysis(analysis),
            invocation.cache_hit,
        )))
    }
}

impl fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

/// Decode a stage payload into the node's record type
/// Problem and attempt, both populated
fn analysis_inputs(state: &SessionState) -> Option<(&Problem, &StudentAttempt)> {
    if !(state.is_populated(StateField::Problem) && state.is_populated(StateField::StudentAttempt)) {
        return None;
    }
    Some((state.problem.as_ref()?, state.student_attempt.as_ref()?))
}

fn into_record<T: DeserializeOwned>(stage: Stage, payload: Value) -> Result<T> {
    match payload {
        Value::Object(map) => serde_json::from_value(Value::Object(map))
            .map_err(|e| OrchestratorError::invalid_payload(stage.as_str(), e.to_string())),
        Value::Array(_) => Err(OrchestratorError::invalid_payload(
            stage.as_str(),
            "expected a JSON object, got an array",
        )),
        _ => Err(OrchestratorError::invalid_payload(
            stage.as_str(),
            "expected a JSON object",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_test_utils::ScriptedGenerationClient;
    use serde_json::json;

    #[test]
    fn node_names_and_stages() {
        let names: Vec<_> = PipelineNode::ALL.iter().map(|n| n.as_str()).collect();
        assert_eq!(names[0], "generate_problem");
        assert_eq!(names[7], "identify_disability");
        assert_eq!(PipelineNode::AdaptiveDifficulty.stage(), None);
        assert_eq!(
            PipelineNode::SimulateAttempt.stage(),
            Some(Stage::SimulateStudent)
        );
    }

    #[tokio::test]
    async fn empty_problem_payload_is_fatal() {
        let client = ScriptedGenerationClient::new().with_payload(Stage::GenerateProblem, json!({}));
        let orchestrator = SessionOrchestrator::new(Arc::new(client));

        let err = orchestrator
            .generate_problem("7th", DifficultyLevel::Medium, true)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidPayload { stage: "generate_problem", .. }));
    }

    #[tokio::test]
    async fn array_payload_is_rejected_for_records() {
        let client = ScriptedGenerationClient::new()
            .with_payload(Stage::GenerateProblem, json!({"problem": "2 + 2", "answer": 4}))
            .with_payload(Stage::SimulateStudent, json!([1, 2]));
        let orchestrator = SessionOrchestrator::new(Arc::new(client));

        let mut state = SessionState::new();
        orchestrator
            .run_node(PipelineNode::GenerateProblem, &mut state)
            .await
            .unwrap();
        let err = orchestrator
            .run_node(PipelineNode::SimulateAttempt, &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidPayload { .. }));
        assert!(state.student_attempt.is_none());
    }

    #[tokio::test]
    async fn skipped_node_records_nothing() {
        let client = Arc::new(ScriptedGenerationClient::new());
        let orchestrator = SessionOrchestrator::new(client.clone());

        let mut state = SessionState::new();
        let ran = orchestrator
            .run_node(PipelineNode::TutorSession, &mut state)
            .await
            .unwrap();
        assert!(!ran);
        assert!(state.metadata.cache_status.is_empty());
        assert_eq!(client.call_count(), 0);
    }
}
