//! Workflow service
//!
//! Transport-agnostic entry points. Each call normalizes the payload, runs
//! the relevant part of the pipeline and shapes the response.

use crate::config::CoachConfig;
use crate::error::Result;
use crate::orchestrator::{PipelineNode, SessionOrchestrator};
use coach_adaptive::{DifficultyLevel, HistoryInput, Recommendation};
use coach_generation::{CachedGenerationClient, GenerationClient, OpenAiGenerator, StageRegistry};
use coach_state::{
    build_initial_state, derive_current_step, format_workflow_results, sanitize, CurrentStep,
    SessionPayload, SessionState, WorkflowResponse, WorkflowType,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Entry points for every workflow variant
#[derive(Debug, Clone)]
pub struct WorkflowService {
    orchestrator: SessionOrchestrator,
}

impl WorkflowService {
    /// Create service over an orchestrator
    #[inline]
    #[must_use]
    pub fn new(orchestrator: SessionOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Create service over a generation client
    #[must_use]
    pub fn from_client(client: Arc<dyn GenerationClient>) -> Self {
        Self::new(SessionOrchestrator::new(client))
    }

    /// Wire the OpenAI backend, stage registry and response cache
    ///
    /// # Errors
    /// Fails if the backend cannot be built, e.g. without an API key.
    pub fn from_config(config: &CoachConfig) -> Result<Self> {
        let generator = OpenAiGenerator::new(&config.openai)?;
        tracing::info!(
            model = generator.model(),
            cache_enabled = config.cache.enabled,
            "generation backend ready"
        );
        let registry = StageRegistry::with_defaults(Arc::new(generator));
        let client = CachedGenerationClient::from_config(registry, &config.cache);
        Ok(Self::from_client(Arc::new(client)))
    }

    /// Underlying orchestrator
    #[inline]
    #[must_use]
    pub fn orchestrator(&self) -> &SessionOrchestrator {
        &self.orchestrator
    }

    /// Dispatch on the payload's workflow type, `full` by default
    ///
    /// # Errors
    /// Client errors for unknown workflow types or invalid payloads, server
    /// errors for failed stages.
    pub async fn run_workflow(&self, payload: SessionPayload) -> Result<WorkflowResponse> {
        match payload.resolve_workflow()? {
            WorkflowType::Full => self.run_full_workflow(payload).await,
            WorkflowType::ProblemOnly => self.run_problem_workflow(payload).await,
            WorkflowType::AnalysisOnly => self.run_analysis_workflow(payload).await,
        }
    }

    /// Run the whole pipeline
    ///
    /// # Errors
    /// See [`WorkflowService::run_workflow`].
    pub async fn run_full_workflow(&self, payload: SessionPayload) -> Result<WorkflowResponse> {
        self.run_graph_workflow(payload.with_workflow_type(WorkflowType::Full.as_str()))
            .await
    }

    /// Generate only the problem
    ///
    /// `metadata.refresh_problem` bypasses the response cache. The envelope
    /// carries the problem and nothing else.
    ///
    /// # Errors
    /// See [`WorkflowService::run_workflow`].
    pub async fn run_problem_workflow(&self, payload: SessionPayload) -> Result<WorkflowResponse> {
        let workflow = WorkflowType::ProblemOnly;
        let mut state = build_initial_state(payload.with_workflow_type(workflow.as_str()))?;
        tracing::info!(workflow = %workflow, "workflow started");

        self.orchestrator
            .run_node(PipelineNode::GenerateProblem, &mut state)
            .await?;

        let mut view = SessionState::new()
            .with_grade_level(state.grade_level.clone())
            .with_difficulty(state.difficulty)
            .with_disability(state.disability.clone());
        view.problem = state.problem.take();

        let step = derive_current_step(&view);
        tracing::info!(workflow = %workflow, current_step = %step, "workflow finished");
        Ok(format_workflow_results(&view, workflow, step)?)
    }

    /// Run the analysis stages over a caller-provided problem and attempt
    ///
    /// # Errors
    /// [`coach_state::StateError::MissingField`] before any invocation if
    /// either input is missing or empty.
    pub async fn run_analysis_workflow(&self, payload: SessionPayload) -> Result<WorkflowResponse> {
        payload.require_analysis_inputs()?;
        self.run_graph_workflow(payload.with_workflow_type(WorkflowType::AnalysisOnly.as_str()))
            .await
    }

    /// Run the pipeline and return the raw session state
    ///
    /// Kept for callers that predate the response envelope; the result
    /// includes bookkeeping such as `cache_status`.
    ///
    /// # Errors
    /// See [`WorkflowService::run_workflow`].
    pub async fn run_learning_session(&self, payload: SessionPayload) -> Result<Map<String, Value>> {
        let mut state = build_initial_state(payload)?;
        self.orchestrator.run_pipeline(&mut state).await?;
        Ok(sanitize(&state)?)
    }

    /// Recommend the next difficulty from a session history
    ///
    /// # Errors
    /// Client error if `current` is not a difficulty level or an encoded
    /// history is not a JSON array of records.
    pub fn recommend_difficulty(
        &self,
        history: HistoryInput,
        current: &str,
    ) -> Result<Recommendation> {
        let current: DifficultyLevel = current.parse()?;
        let records = history.into_records()?;
        Ok(self.orchestrator.controller().recommend(&records, current))
    }

    async fn run_graph_workflow(&self, payload: SessionPayload) -> Result<WorkflowResponse> {
        let mut state = build_initial_state(payload)?;
        let workflow = state.workflow_type();
        tracing::info!(workflow = %workflow, "workflow started");

        self.orchestrator.run_pipeline(&mut state).await?;

        let step = CurrentStep::Completed;
        tracing::info!(workflow = %workflow, current_step = %step, "workflow finished");
        Ok(format_workflow_results(&state, workflow, step)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestratorError;
    use coach_generation::{OpenAiConfig, Stage};
    use coach_test_utils::{fixtures, ScriptedGenerationClient};
    use serde_json::json;

    #[test]
    fn from_config_requires_api_key() {
        let config = CoachConfig::new().with_openai(OpenAiConfig::default());
        let err = WorkflowService::from_config(&config).unwrap_err();
        assert!(matches!(err, OrchestratorError::Generation(_)));

        let config = config.with_openai(OpenAiConfig::default().with_api_key("sk-test"));
        assert!(WorkflowService::from_config(&config).is_ok());
    }

    #[test]
    fn recommend_difficulty_accepts_encoded_history() {
        let service = WorkflowService::from_client(Arc::new(ScriptedGenerationClient::new()));
        let history = HistoryInput::Encoded(
            json!([{"consistency_score": 0.2, "is_correct": false}]).to_string(),
        );
        let rec = service.recommend_difficulty(history, "Medium").unwrap();
        assert_eq!(rec.recommended_difficulty, DifficultyLevel::Easy);

        let err = service
            .recommend_difficulty(HistoryInput::Records(Vec::new()), "extreme")
            .unwrap_err();
        assert!(err.is_client_error());

        let err = service
            .recommend_difficulty(HistoryInput::Encoded("{}".to_string()), "easy")
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn unknown_workflow_rejected_before_invocation() {
        let client = Arc::new(ScriptedGenerationClient::new());
        let service = WorkflowService::from_client(client.clone());

        let err = service
            .run_workflow(SessionPayload::new().with_workflow_type("everything"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn learning_session_keeps_bookkeeping() {
        let client = fixtures::scripted_pipeline();
        let service = WorkflowService::from_client(Arc::new(client));

        let state = service
            .run_learning_session(SessionPayload::new())
            .await
            .unwrap();
        let cache_status = &state["metadata"]["cache_status"];
        assert_eq!(cache_status["generate_problem"], false);
        assert!(state.contains_key("problem"));
        assert!(!state.contains_key("student_history"));
    }

    #[tokio::test]
    async fn problem_workflow_refresh_bypasses_cache() {
        let client = Arc::new(
            ScriptedGenerationClient::new()
                .with_payload(Stage::GenerateProblem, fixtures::problem())
                .with_cache_hit(Stage::GenerateProblem, true),
        );
        let service = WorkflowService::from_client(client.clone());

        let payload = SessionPayload::new().with_metadata("refresh_problem", json!(true));
        service.run_problem_workflow(payload).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].use_cache);
    }
}
