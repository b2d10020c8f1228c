//! Testing utilities for the coach workspace
//!
//! Generation doubles that never touch the network, plus payload fixtures.

#![allow(missing_docs)]

pub mod fixtures;

use coach_generation::{
    CompletionRequest, GenerationClient, GenerationError, Invocation, Stage, TextGenerator,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One recorded `invoke` call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub stage: Stage,
    pub args: Vec<String>,
    pub use_cache: bool,
}

/// Generation client answering from per-stage scripts
///
/// Stages without a script fail with [`GenerationError::UnregisteredStage`].
/// The cache-hit flag is whatever was scripted, and always `false` when the
/// caller bypasses the cache.
#[derive(Debug, Default)]
pub struct ScriptedGenerationClient {
    payloads: HashMap<Stage, Value>,
    cache_hits: HashMap<Stage, bool>,
    failures: HashMap<Stage, String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerationClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `stage` with `payload`
    #[must_use]
    pub fn with_payload(mut self, stage: Stage, payload: Value) -> Self {
        self.payloads.insert(stage, payload);
        self
    }

    /// Report `stage` as served from cache
    #[must_use]
    pub fn with_cache_hit(mut self, stage: Stage, hit: bool) -> Self {
        self.cache_hits.insert(stage, hit);
        self
    }

    /// Fail `stage` with an invalid-payload error
    #[must_use]
    pub fn with_failure(mut self, stage: Stage, detail: impl Into<String>) -> Self {
        self.failures.insert(stage, detail.into());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Stages invoked, in call order
    pub fn stages(&self) -> Vec<Stage> {
        self.calls.lock().iter().map(|c| c.stage).collect()
    }

    pub fn calls_for(&self, stage: Stage) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.stage == stage)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl GenerationClient for ScriptedGenerationClient {
    async fn invoke(
        &self,
        stage: Stage,
        args: Vec<String>,
        use_cache: bool,
    ) -> Result<Invocation, GenerationError> {
        stage.check_args(&args)?;
        self.calls.lock().push(RecordedCall {
            stage,
            args,
            use_cache,
        });

        if let Some(detail) = self.failures.get(&stage) {
            return Err(GenerationError::invalid_payload(stage.as_str(), detail.clone()));
        }
        let payload = self
            .payloads
            .get(&stage)
            .cloned()
            .ok_or_else(|| GenerationError::UnregisteredStage(stage.as_str().to_string()))?;

        let hit = use_cache && self.cache_hits.get(&stage).copied().unwrap_or(false);
        Ok(Invocation { payload, cache_hit: hit })
    }
}

/// Text generator returning the same completion for every prompt
#[derive(Debug)]
pub struct StaticTextGenerator {
    response: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StaticTextGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Serialize `value` as the completion
    pub fn json(value: &Value) -> Self {
        Self::new(value.to_string())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait::async_trait]
impl TextGenerator for StaticTextGenerator {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt);
        Ok(self.response.clone())
    }
}
