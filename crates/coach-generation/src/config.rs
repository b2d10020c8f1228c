//! Generation backend and cache configuration

use serde::{Deserialize, Serialize};

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Consult and fill the cache
    pub enabled: bool,
    /// Entry lifetime in seconds, 0 for no expiry
    pub ttl_secs: u64,
    /// Maximum entries, clamped to at least 1
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 600,
            max_entries: 128,
        }
    }
}

impl CacheConfig {
    /// With caching enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// With entry lifetime
    #[inline]
    #[must_use]
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// With capacity
    #[inline]
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Override from `COACH_CACHE_ENABLED`, `COACH_CACHE_TTL`, `COACH_CACHE_SIZE`
    ///
    /// Unparseable numbers leave the current value in place.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flag) = lookup("COACH_CACHE_ENABLED") {
            self.enabled = !matches!(
                flag.trim().to_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        if let Some(ttl) = lookup("COACH_CACHE_TTL").and_then(|v| v.trim().parse().ok()) {
            self.ttl_secs = ttl;
        }
        if let Some(size) = lookup("COACH_CACHE_SIZE").and_then(|v| v.trim().parse::<u64>().ok()) {
            self.max_entries = size;
        }
        self.max_entries = self.max_entries.max(1);
    }
}

/// OpenAI-compatible backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// API base URL without the `/chat/completions` suffix
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

impl OpenAiConfig {
    /// With API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// With model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override from `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL").filter(|v| !v.trim().is_empty()) {
            self.model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
    }
}
