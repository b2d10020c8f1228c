//! Text generation backend
//!
//! [`TextGenerator`] is the seam between prompt handlers and a language
//! model. [`OpenAiGenerator`] talks to an OpenAI-compatible chat completions
//! endpoint in JSON mode.

use crate::config::OpenAiConfig;
use crate::error::GenerationError;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Upstream error bodies are cut to this many characters
const ERROR_BODY_CHARS: usize = 500;

/// One completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Full prompt sent as a single user message
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    /// Create request
    #[inline]
    #[must_use]
    pub fn new(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
        }
    }
}

/// Produces raw completion text for a prompt
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a prompt, returning the raw model text
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError>;
}

/// OpenAI chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiGenerator {
    /// Create generator from configuration
    ///
    /// # Errors
    /// [`GenerationError::MissingCredentials`] without an API key,
    /// [`GenerationError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &OpenAiConfig) -> Result<Self, GenerationError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GenerationError::MissingCredentials("OPENAI_API_KEY"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }

    /// Model name
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Chat completions URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let body = json!({
            "model": &self.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": request.temperature,
            "response_format": {"type": "json_object"},
        });

        tracing::debug!(model = %self.model, temperature = request.temperature, "requesting completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(GenerationError::EmptyCompletion)
    }
}
