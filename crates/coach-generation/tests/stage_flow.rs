//! Stages through the default registry and the cached client

use coach_generation::{
    cache_key, CacheConfig, CachedGenerationClient, CompletionRequest, GenerationClient,
    GenerationError, ResponseCache, Stage, StageRegistry, TextGenerator,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Records prompts and answers every one with the same object
struct RecordingGenerator {
    reply: Value,
    calls: AtomicUsize,
    last: Mutex<Option<CompletionRequest>>,
}

impl RecordingGenerator {
    fn new(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.last
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.prompt.clone())
            .unwrap_or_default()
    }

    fn last_temperature(&self) -> f32 {
        self.last.lock().unwrap().as_ref().map_or(0.0, |r| r.temperature)
    }
}

#[async_trait::async_trait]
impl TextGenerator for RecordingGenerator {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request);
        Ok(format!("  {}\n", self.reply))
    }
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

fn client(generator: &Arc<RecordingGenerator>) -> CachedGenerationClient {
    let registry = StageRegistry::with_defaults(generator.clone());
    CachedGenerationClient::from_config(registry, &CacheConfig::default())
}

#[tokio::test]
async fn prompts_carry_arguments_and_temperature() {
    let generator = RecordingGenerator::new(json!({"problem": "x"}));
    let client = client(&generator);

    client
        .invoke(Stage::GenerateProblem, args(&["5th", "hard"]), true)
        .await
        .unwrap();
    assert!(generator.last_prompt().contains("5th"));
    assert!(generator.last_prompt().contains("hard"));
    assert!((generator.last_temperature() - 0.5).abs() < f32::EPSILON);

    client
        .invoke(Stage::SimulateStudent, args(&["ADHD", "What is 8 x 7?"]), true)
        .await
        .unwrap();
    let prompt = generator.last_prompt();
    assert!(prompt.contains("What is 8 x 7?"));
    assert!(!prompt.contains("{{"));
    assert!((generator.last_temperature() - 0.7).abs() < f32::EPSILON);
}

#[tokio::test]
async fn identical_invocations_share_one_generation() {
    let generator = RecordingGenerator::new(json!({"likely_disability": "Dyscalculia"}));
    let client = client(&generator);
    let call = args(&["What is 8 x 7?", "I counted 8 seven times and got 54"]);

    let first = client
        .invoke(Stage::IdentifyDisability, call.clone(), true)
        .await
        .unwrap();
    let second = client
        .invoke(Stage::IdentifyDisability, call.clone(), true)
        .await
        .unwrap();
    let other = client
        .invoke(Stage::IdentifyDisability, args(&["What is 8 x 7?", "56"]), true)
        .await
        .unwrap();

    assert_eq!(generator.calls(), 2);
    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert!(!other.cache_hit);
    assert_eq!(second.payload["likely_disability"], "Dyscalculia");
}

#[tokio::test]
async fn consistency_validation_needs_no_backend() {
    let generator = RecordingGenerator::new(json!({}));
    let client = client(&generator);
    let attempt = json!({
        "thoughtprocess": "Seven eights... I lost count, so 54",
        "steps_to_solve": ["8 + 8 = 16", "16 + 8 = 24", "I keep adding to 54"],
        "disability_impact": "Lost track while counting"
    });

    let report = client
        .invoke(
            Stage::ConsistencyValidation,
            args(&["What is 8 x 7?", "Dyscalculia", &attempt.to_string(), "56"]),
            true,
        )
        .await
        .unwrap()
        .payload;

    assert_eq!(generator.calls(), 0);
    let checks = report["checks"].as_object().unwrap();
    assert_eq!(checks.len(), 5);
    let overall = report["overall_consistency_score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&overall));
}

#[tokio::test]
async fn cache_key_separates_stages() {
    let same = args(&["a", "b"]);
    assert_eq!(
        cache_key(Stage::IdentifyDisability, &same),
        cache_key(Stage::IdentifyDisability, &same)
    );
    assert_ne!(
        cache_key(Stage::IdentifyDisability, &same),
        cache_key(Stage::SimulateStudent, &same)
    );

    let cache = ResponseCache::new(8);
    cache
        .insert(cache_key(Stage::SimulateStudent, &same), json!({"cached": true}))
        .await;
    let generator = RecordingGenerator::new(json!({"cached": false}));
    let client = CachedGenerationClient::new(StageRegistry::with_defaults(generator.clone()))
        .with_cache(cache);

    let hit = client
        .invoke(Stage::SimulateStudent, same.clone(), true)
        .await
        .unwrap();
    assert!(hit.cache_hit);
    assert_eq!(hit.payload, json!({"cached": true}));

    let fresh = client.invoke(Stage::SimulateStudent, same, false).await.unwrap();
    assert!(!fresh.cache_hit);
    assert_eq!(generator.calls(), 1);
}
