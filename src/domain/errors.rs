//! Domain errors for the Conclave research pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ports::ProviderError;

/// Pipeline phase an error surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Workflow selection
    Selection,
    /// Backend dispatch
    Dispatch,
    /// Outlier isolation
    Outlier,
    /// Consensus and variance analysis
    Consensus,
    /// Result assembly
    Assembly,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Selection => "selection",
            Self::Dispatch => "dispatch",
            Self::Outlier => "outlier",
            Self::Consensus => "consensus",
            Self::Assembly => "assembly",
        };
        f.write_str(name)
    }
}

/// Errors that can abort a research request.
///
/// Only `Validation`, `NoProviders`, `ConsensusComputation` and
/// `DeadlineExceeded` are fatal to a request. `Provider` wraps a single call
/// failure; the dispatch coordinator recovers those locally.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Request failed validation
    #[error("Invalid research request: {0}")]
    Validation(String),

    /// A single provider call failed
    #[error("Provider call failed: {0}")]
    Provider(#[from] ProviderError),

    /// No backend could serve the request
    #[error("No reachable backends for topic '{topic}'")]
    NoProviders {
        /// Topic of the rejected request
        topic: String,
    },

    /// The pipeline produced nothing to analyze
    #[error("Consensus computation failed during {phase} for topic '{topic}': {cause}")]
    ConsensusComputation {
        /// Phase that failed
        phase: Phase,
        /// Topic of the request
        topic: String,
        /// What went wrong
        cause: String,
    },

    /// The request deadline passed
    #[error("Deadline exceeded during {phase} for topic '{topic}' after {elapsed_ms}ms")]
    DeadlineExceeded {
        /// Phase that was running
        phase: Phase,
        /// Topic of the request
        topic: String,
        /// Time spent before giving up
        elapsed_ms: u64,
    },
}

impl ResearchError {
    /// Phase this error belongs to, when it carries one.
    pub const fn phase(&self) -> Option<Phase> {
        match self {
            Self::Validation(_) => None,
            Self::Provider(_) => Some(Phase::Dispatch),
            Self::NoProviders { .. } => Some(Phase::Selection),
            Self::ConsensusComputation { phase, .. } | Self::DeadlineExceeded { phase, .. } => {
                Some(*phase)
            }
        }
    }

    /// Whether this error aborts the whole request.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Provider(_))
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consensus_error_carries_context() {
        let err = ResearchError::ConsensusComputation {
            phase: Phase::Dispatch,
            topic: "battery chemistry".to_string(),
            cause: "all 3 backend calls failed".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("dispatch"));
        assert!(message.contains("battery chemistry"));
        assert!(message.contains("all 3 backend calls failed"));
        assert_eq!(err.phase(), Some(Phase::Dispatch));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_provider_error_is_not_fatal() {
        let err: ResearchError = ProviderError::Timeout(30).into();
        assert!(!err.is_fatal());
        assert_eq!(err.phase(), Some(Phase::Dispatch));
    }

    #[test]
    fn test_validation_has_no_phase() {
        let err = ResearchError::Validation("topic is empty".to_string());
        assert_eq!(err.phase(), None);
    }
}
