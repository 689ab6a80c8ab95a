//! Application layer
//!
//! Use-case orchestration on top of the pipeline services:
//! - ResearchOrchestrator: a request from validation to assembled result

pub mod research_orchestrator;

pub use research_orchestrator::ResearchOrchestrator;
