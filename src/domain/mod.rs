//! Domain layer for the Conclave research pipeline
//!
//! Core data model, error taxonomy and collaborator ports. Nothing in here
//! performs I/O.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainResult, Phase, ResearchError};
