//! Generation client
//!
//! [`GenerationClient`] is the seam the pipeline depends on. Each invocation
//! reports whether it was served from cache alongside its payload, so a
//! single client can be shared across concurrent sessions.

use crate::cache::{cache_key, ResponseCache};
use crate::config::CacheConfig;
use crate::error::GenerationError;
use crate::registry::StageRegistry;
use crate::stage::Stage;
use serde_json::Value;

/// Result of one stage invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// JSON object or array produced by the stage
    pub payload: Value,
    /// Served from the response cache
    pub cache_hit: bool,
}

impl Invocation {
    /// Freshly generated payload
    #[inline]
    #[must_use]
    pub fn fresh(payload: Value) -> Self {
        Self {
            payload,
            cache_hit: false,
        }
    }

    /// Payload served from cache
    #[inline]
    #[must_use]
    pub fn cached(payload: Value) -> Self {
        Self {
            payload,
            cache_hit: true,
        }
    }
}

/// Invokes stages by name
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    /// Run a stage; `use_cache = false` forces a fresh result
    async fn invoke(
        &self,
        stage: Stage,
        args: Vec<String>,
        use_cache: bool,
    ) -> Result<Invocation, GenerationError>;
}

/// Registry-backed client with an optional response cache
#[derive(Debug, Clone)]
pub struct CachedGenerationClient {
    registry: StageRegistry,
    cache: Option<ResponseCache>,
}

impl CachedGenerationClient {
    /// Create client without caching
    #[must_use]
    pub fn new(registry: StageRegistry) -> Self {
        Self {
            registry,
            cache: None,
        }
    }

    /// Create client from cache configuration
    #[must_use]
    pub fn from_config(registry: StageRegistry, config: &CacheConfig) -> Self {
        Self {
            registry,
            cache: config.enabled.then(|| ResponseCache::from_config(config)),
        }
    }

    /// With an explicit cache
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Cache in use, if any
    #[inline]
    #[must_use]
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Handler registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }
}

#[async_trait::async_trait]
impl GenerationClient for CachedGenerationClient {
    async fn invoke(
        &self,
        stage: Stage,
        args: Vec<String>,
        use_cache: bool,
    ) -> Result<Invocation, GenerationError> {
        let handler = self.registry.get(stage)?;
        stage.check_args(&args)?;

        let cache = self.cache.as_ref().filter(|_| use_cache);
        let key = cache.map(|_| cache_key(stage, &args));

        if let (Some(cache), Some(key)) = (cache, key.as_deref()) {
            if let Some(payload) = cache.get(key).await {
                tracing::debug!(stage = %stage, "stage served from cache");
                return Ok(Invocation::cached(payload));
            }
        }

        let payload = handler.handle(&args).await?;
        if !matches!(payload, Value::Object(_) | Value::Array(_)) {
            return Err(GenerationError::invalid_payload(
                stage.as_str(),
                "handler returned a non-structured value",
            ));
        }

        if let (Some(cache), Some(key)) = (cache, key) {
            cache.insert(key, payload.clone()).await;
        }
        tracing::debug!(stage = %stage, "stage generated");
        Ok(Invocation::fresh(payload))
    }
}
