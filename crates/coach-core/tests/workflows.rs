//! Workflow service entry points

use coach_core::{OrchestratorError, WorkflowService};
use coach_generation::{CacheConfig, CachedGenerationClient, Stage, StageRegistry};
use coach_state::{CurrentStep, SessionPayload, StateError, WorkflowType};
use coach_test_utils::{fixtures, ScriptedGenerationClient, StaticTextGenerator};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn service(client: &Arc<ScriptedGenerationClient>) -> WorkflowService {
    WorkflowService::from_client(client.clone())
}

#[tokio::test]
async fn full_workflow_envelope() {
    let client = Arc::new(fixtures::scripted_pipeline());
    let payload = SessionPayload::new()
        .with_disability("ADHD")
        .with_student_response("19 - 3 = 15")
        .with_student_history(json!([{"consistency_score": 0.6, "is_correct": true}]));

    let response = service(&client).run_workflow(payload).await.unwrap();

    assert_eq!(response.workflow_type, WorkflowType::Full);
    assert_eq!(response.current_step, CurrentStep::Completed);
    let keys: Vec<&str> = response.results.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "generated_problem",
            "student_simulation",
            "thought_analysis",
            "teaching_strategies",
            "tutor_session",
            "consistency_validation",
            "adaptive_plan",
            "disability_analysis",
        ]
    );
    assert_eq!(response.metadata.disability, "ADHD");
    assert_eq!(response.metadata.grade_level, "7th");
}

#[tokio::test]
async fn problem_workflow_reports_only_the_problem() {
    let client = Arc::new(fixtures::scripted_pipeline());
    let payload = SessionPayload::new()
        .with_workflow_type("PROBLEM_ONLY")
        .with_student_attempt(fixtures::attempt());

    let response = service(&client).run_workflow(payload).await.unwrap();

    assert_eq!(response.workflow_type, WorkflowType::ProblemOnly);
    assert_eq!(response.current_step, CurrentStep::ProblemGenerated);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results["generated_problem"], fixtures::problem());
    assert_eq!(client.stages(), vec![Stage::GenerateProblem]);
}

#[tokio::test]
async fn problem_workflow_with_provided_problem_does_not_invoke() {
    let client = Arc::new(fixtures::scripted_pipeline());
    let payload = SessionPayload::new().with_problem(json!("What is 9 x 6?"));

    let response = service(&client)
        .run_problem_workflow(payload)
        .await
        .unwrap();

    assert_eq!(response.results["generated_problem"], json!({"problem": "What is 9 x 6?"}));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn analysis_workflow_requires_attempt_before_any_call() {
    let client = Arc::new(fixtures::scripted_pipeline());
    let payload = SessionPayload::new()
        .with_workflow_type("analysis_only")
        .with_problem(fixtures::problem());

    let err = service(&client).run_workflow(payload).await.unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::Validation(StateError::MissingField {
            field: "student_attempt",
            ..
        })
    ));
    assert_eq!(err.status_code(), 400);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn analysis_workflow_runs_from_seeded_inputs() {
    let client = Arc::new(fixtures::scripted_pipeline());
    let payload = SessionPayload::new()
        .with_problem(fixtures::problem())
        .with_student_attempt(json!(fixtures::attempt().to_string()));

    let response = service(&client)
        .run_analysis_workflow(payload)
        .await
        .unwrap();

    assert_eq!(response.workflow_type, WorkflowType::AnalysisOnly);
    assert_eq!(response.current_step, CurrentStep::Completed);
    assert_eq!(response.results["student_simulation"], fixtures::attempt());
    assert!(response.results.contains_key("consistency_validation"));
    assert!(!client.stages().contains(&Stage::GenerateProblem));
    assert!(!client.stages().contains(&Stage::SimulateStudent));
}

#[tokio::test]
async fn malformed_history_is_a_client_error() {
    let client = Arc::new(fixtures::scripted_pipeline());
    let payload = SessionPayload::new().with_student_history(json!("not json"));

    let err = service(&client).run_workflow(payload).await.unwrap_err();

    assert!(err.is_client_error());
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn repeated_workflow_is_served_from_cache() {
    let generator = Arc::new(StaticTextGenerator::json(&fixtures::universal_completion()));
    let registry = StageRegistry::with_defaults(generator.clone());
    let client = CachedGenerationClient::from_config(registry, &CacheConfig::default());
    let service = WorkflowService::from_client(Arc::new(client));

    let payload = SessionPayload::new().with_student_response("I got 61");
    let first = service.run_learning_session(payload.clone()).await.unwrap();
    let calls_after_first = generator.call_count();
    let second = service.run_learning_session(payload).await.unwrap();

    assert_eq!(calls_after_first, 6);
    assert_eq!(generator.call_count(), calls_after_first);
    assert_eq!(first["metadata"]["cache_status"]["tutor_session"], false);
    assert!(second["metadata"]["cache_status"]
        .as_object()
        .unwrap()
        .values()
        .all(|hit| hit == &json!(true)));
    assert_eq!(first["problem"], second["problem"]);
    assert!(first["consistency_report"]["overall_consistency_score"].is_number());
}
