//! Stage handlers
//!
//! A [`StageHandler`] turns positional string arguments into a structured
//! payload. Prompt-backed stages go through a [`TextGenerator`]; consistency
//! validation is computed locally.

use crate::consistency::validate_consistency;
use crate::error::GenerationError;
use crate::generator::{CompletionRequest, TextGenerator};
use crate::payload::parse_payload;
use crate::prompts;
use crate::stage::Stage;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Produces the payload for one stage
#[async_trait::async_trait]
pub trait StageHandler: Send + Sync {
    /// Run the stage with its positional arguments
    async fn handle(&self, args: &[String]) -> Result<Value, GenerationError>;
}

/// Handler that renders a prompt and parses the completion
pub struct PromptHandler {
    stage: Stage,
    temperature: f32,
    generator: Arc<dyn TextGenerator>,
}

impl PromptHandler {
    /// Create handler for a prompt-backed stage
    ///
    /// Returns `None` for stages that have no template.
    #[must_use]
    pub fn new(stage: Stage, generator: Arc<dyn TextGenerator>) -> Option<Self> {
        prompts::template(stage)?;
        Some(Self {
            stage,
            temperature: stage.temperature()?,
            generator,
        })
    }

    /// Stage served
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }
}

impl std::fmt::Debug for PromptHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptHandler")
            .field("stage", &self.stage)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl StageHandler for PromptHandler {
    async fn handle(&self, args: &[String]) -> Result<Value, GenerationError> {
        let prompt = prompts::render(self.stage, args)?;
        let raw = self
            .generator
            .complete(CompletionRequest::new(prompt, self.temperature))
            .await?;
        parse_payload(self.stage.as_str(), &raw)
    }
}

/// Local consistency validator
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyHandler;

#[async_trait::async_trait]
impl StageHandler for ConsistencyHandler {
    async fn handle(&self, args: &[String]) -> Result<Value, GenerationError> {
        let stage = Stage::ConsistencyValidation;
        stage.check_args(args)?;
        let (disability, attempt_json, expected_answer) = (&args[1], &args[2], &args[3]);

        let attempt = match parse_payload(stage.as_str(), attempt_json)? {
            Value::Object(map) => map,
            Value::Array(_) => {
                return Err(GenerationError::invalid_payload(
                    stage.as_str(),
                    "student attempt must be a JSON object",
                ))
            }
            _ => Map::new(),
        };

        let report = validate_consistency(disability, &attempt, expected_answer);
        serde_json::to_value(report)
            .map_err(|e| GenerationError::invalid_payload(stage.as_str(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockTextGenerator;
    use serde_json::json;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn prompt_handler_only_for_templated_stages() {
        let generator: Arc<dyn TextGenerator> = Arc::new(MockTextGenerator::new());
        assert!(PromptHandler::new(Stage::ConsistencyValidation, generator.clone()).is_none());
        let handler = PromptHandler::new(Stage::TutorSession, generator).unwrap();
        assert_eq!(handler.stage(), Stage::TutorSession);
    }

    #[tokio::test]
    async fn prompt_handler_parses_completion() {
        let mut mock = MockTextGenerator::new();
        mock.expect_complete()
            .withf(|req| {
                (req.temperature - 0.5).abs() < f32::EPSILON && req.prompt.contains("3rd grade")
            })
            .times(1)
            .returning(|_| Ok(r#"{"problem": "Tom has 3 apples", "answer": "3"}"#.to_string()));

        let handler = PromptHandler::new(Stage::GenerateProblem, Arc::new(mock)).unwrap();
        let payload = handler.handle(&args(&["3rd", "easy"])).await.unwrap();
        assert_eq!(payload["problem"], "Tom has 3 apples");
    }

    #[tokio::test]
    async fn prompt_handler_rejects_non_json() {
        let mut mock = MockTextGenerator::new();
        mock.expect_complete()
            .returning(|_| Ok("Sure! Here is your problem.".to_string()));

        let handler = PromptHandler::new(Stage::SimulateStudent, Arc::new(mock)).unwrap();
        let err = handler
            .handle(&args(&["Dyslexia", "What is 2 + 2?"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidPayload { .. }));
    }

    #[tokio::test]
    async fn prompt_handler_checks_arity_before_calling_backend() {
        let mut mock = MockTextGenerator::new();
        mock.expect_complete().times(0);

        let handler = PromptHandler::new(Stage::AnalyzeThought, Arc::new(mock)).unwrap();
        let err = handler.handle(&args(&["Dyslexia"])).await.unwrap_err();
        assert!(matches!(err, GenerationError::ArgumentCount { .. }));
    }

    #[tokio::test]
    async fn consistency_handler_scores_attempt() {
        let attempt = json!({
            "thoughtprocess": "I reversed the digits and got confused reading it again",
            "steps_to_solve": ["12 + 7 = 19", "19 - 3 = 16"],
            "disability_impact": "transposed numbers"
        });
        let payload = ConsistencyHandler
            .handle(&args(&["p", "Dyslexia", &attempt.to_string(), "16"]))
            .await
            .unwrap();

        assert_eq!(payload["checks"]["step_answer_consistency"]["score"], 1.0);
        assert!(payload["overall_consistency_score"].as_f64().unwrap() > 0.5);
    }

    #[tokio::test]
    async fn consistency_handler_rejects_bad_attempt() {
        let err = ConsistencyHandler
            .handle(&args(&["p", "Dyslexia", "not json", "4"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidPayload { .. }));

        let err = ConsistencyHandler
            .handle(&args(&["p", "Dyslexia", "{}"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::ArgumentCount { .. }));
    }
}
