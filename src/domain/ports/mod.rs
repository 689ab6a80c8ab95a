//! Port trait definitions (Hexagonal Architecture)
//!
//! Interfaces to the collaborators the research pipeline consumes or feeds:
//! - ModelProvider: text-generation backends
//! - PersonaSource: opaque system prompts
//! - GroundingSource: optional external context
//! - ResultSink: persistence of completed results

pub mod grounding;
pub mod model_provider;
pub mod persona;
pub mod result_sink;

pub use grounding::GroundingSource;
pub use model_provider::{
    FailureKind, GenerationOutput, GenerationRequest, ModelProvider, ProviderError,
};
pub use persona::{PersonaSource, StaticPersonaSource};
pub use result_sink::{InMemoryResultSink, NullResultSink, ResultSink};
