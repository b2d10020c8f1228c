//! Stage handler registry
//!
//! Built once at startup and shared by reference; there is no global
//! registry.

use crate::error::GenerationError;
use crate::generator::TextGenerator;
use crate::handler::{ConsistencyHandler, PromptHandler, StageHandler};
use crate::stage::Stage;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maps stages to their handlers
#[derive(Clone, Default)]
pub struct StageRegistry {
    handlers: BTreeMap<Stage, Arc<dyn StageHandler>>,
}

impl StageRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Create registry with every stage wired to `generator`, plus the local
    /// consistency validator
    #[must_use]
    pub fn with_defaults(generator: Arc<dyn TextGenerator>) -> Self {
        let mut registry = Self::new();
        for stage in Stage::ALL {
            if let Some(handler) = PromptHandler::new(stage, Arc::clone(&generator)) {
                registry.register(stage, Arc::new(handler));
            }
        }
        registry.register(Stage::ConsistencyValidation, Arc::new(ConsistencyHandler));
        registry
    }

    /// Register a handler, replacing any previous one
    pub fn register(&mut self, stage: Stage, handler: Arc<dyn StageHandler>) {
        self.handlers.insert(stage, handler);
    }

    /// Handler for a stage
    ///
    /// # Errors
    /// [`GenerationError::UnregisteredStage`] if no handler is registered.
    pub fn get(&self, stage: Stage) -> Result<Arc<dyn StageHandler>, GenerationError> {
        self.handlers
            .get(&stage)
            .cloned()
            .ok_or_else(|| GenerationError::UnregisteredStage(stage.as_str().to_string()))
    }

    /// Check if stage has a handler
    #[inline]
    #[must_use]
    pub fn contains(&self, stage: Stage) -> bool {
        self.handlers.contains_key(&stage)
    }

    /// Remove handler
    #[inline]
    pub fn remove(&mut self, stage: Stage) -> bool {
        self.handlers.remove(&stage).is_some()
    }

    /// Registered stage names
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }

    /// Get number of registered stages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("stages", &self.names())
            .finish()
    }
}
