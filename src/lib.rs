//! Conclave - multi-model research and consensus engine
//!
//! Conclave sends one research question to several text-generation backends,
//! then measures where they agree, where they diverge, and which answers
//! should be set aside before assembling a single result.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, errors and collaborator ports
//! - **Application Layer** (`application`): End-to-end request orchestration
//! - **Service Layer** (`services`): Selection, dispatch and the analysis pipeline
//! - **Infrastructure Layer** (`infrastructure`): Config, logging, provider admission
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use conclave::{Config, ProviderRegistry, ResearchDepth, ResearchOrchestrator, ResearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let registry = ProviderRegistry::new(config.catalog.clone())
//!         .with_provider("gpt-4o", Arc::new(my_provider))?;
//!     let orchestrator = ResearchOrchestrator::new(&config, Arc::new(registry));
//!     let result = orchestrator
//!         .run(ResearchRequest::new("Outlook for sodium-ion batteries", ResearchDepth::Standard))
//!         .await?;
//!     println!("{}", result.summary);
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::ResearchOrchestrator;
pub use domain::errors::{DomainResult, Phase, ResearchError};
pub use domain::models::{
    BackendCatalog, BackendId, BackendProfile, Config, ModelResponse, ResearchDepth,
    ResearchRequest, ResearchResult, WorkflowPlan,
};
pub use domain::ports::{
    GenerationOutput, GenerationRequest, GroundingSource, ModelProvider, PersonaSource,
    ProviderError, ResultSink,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::providers::{CallPolicy, ProviderRegistry, RetryPolicy};
