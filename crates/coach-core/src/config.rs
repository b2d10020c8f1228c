//! Service configuration
//!
//! Layered: defaults, then an optional TOML file, then environment.

use crate::error::{OrchestratorError, Result};
use coach_generation::{CacheConfig, OpenAiConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    /// Response cache
    pub cache: CacheConfig,
    /// Generation backend
    pub openai: OpenAiConfig,
}

impl CoachConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cache settings
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// With backend settings
    #[inline]
    #[must_use]
    pub fn with_openai(mut self, openai: OpenAiConfig) -> Self {
        self.openai = openai;
        self
    }

    /// Parse a TOML document; missing keys keep their defaults
    ///
    /// # Errors
    /// [`OrchestratorError::Config`] if the document is not valid.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| OrchestratorError::Config(e.to_string()))
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// [`OrchestratorError::Config`] if the file cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| OrchestratorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.cache.apply_env(&lookup);
        self.openai.apply_env(&lookup);
    }

    /// Defaults, then `path` if given, then the process environment
    ///
    /// # Errors
    /// [`OrchestratorError::Config`] if the file cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        tracing::debug!(
            cache_enabled = config.cache.enabled,
            model = %config.openai.model,
            "configuration loaded"
        );
        Ok(config)
    }
}
