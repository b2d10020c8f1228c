//! Stage Generation
//!
//! Everything the pipeline needs to turn a stage name and its arguments into
//! a structured payload.
//!
//! # Components
//!
//! - [`Stage`]: stage names, argument shapes and sampling temperatures
//! - [`StageRegistry`]: explicit stage-to-handler mapping
//! - [`TextGenerator`] / [`OpenAiGenerator`]: language model backend
//! - [`ResponseCache`]: moka-backed payload cache keyed by SHA-256
//! - [`GenerationClient`] / [`CachedGenerationClient`]: cache-aware invocation
//! - [`consistency`]: deterministic attempt validation
//!
//! # Example
//!
//! ```rust,no_run
//! use coach_generation::{
//!     CacheConfig, CachedGenerationClient, GenerationClient, OpenAiConfig, OpenAiGenerator,
//!     Stage, StageRegistry,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), coach_generation::GenerationError> {
//! let generator = OpenAiGenerator::new(&OpenAiConfig::default().with_api_key("sk-..."))?;
//! let registry = StageRegistry::with_defaults(Arc::new(generator));
//! let client = CachedGenerationClient::from_config(registry, &CacheConfig::default());
//!
//! let problem = client
//!     .invoke(Stage::GenerateProblem, vec!["5th".into(), "easy".into()], true)
//!     .await?;
//! println!("{} (cached: {})", problem.payload, problem.cache_hit);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod client;
pub mod config;
pub mod consistency;
pub mod error;
pub mod generator;
pub mod handler;
pub mod payload;
pub mod prompts;
pub mod registry;
pub mod stage;

pub use cache::{cache_key, CacheStats, ResponseCache};
pub use client::{CachedGenerationClient, GenerationClient, Invocation};
pub use config::{CacheConfig, OpenAiConfig};
pub use consistency::{validate_consistency, ConsistencyReport};
pub use error::GenerationError;
pub use generator::{CompletionRequest, OpenAiGenerator, TextGenerator};
pub use handler::{ConsistencyHandler, PromptHandler, StageHandler};
pub use payload::parse_payload;
pub use registry::StageRegistry;
pub use stage::Stage;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
