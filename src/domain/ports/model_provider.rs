//! Model Provider Port
//!
//! Abstraction over a text-generation backend. Concrete SDK integrations
//! (hosted APIs, local runtimes) live outside this crate and implement
//! [`ModelProvider`]; the pipeline never depends on a specific vendor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request for a single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// User prompt (already prefixed with any grounding context)
    pub prompt: String,

    /// Opaque system prompt supplied by the persona collaborator
    pub system_prompt: Option<String>,

    /// Concrete model identifier to invoke
    pub model_id: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature (0.0 - 1.0)
    pub temperature: f32,
}

/// Raw, unvalidated output returned by a provider.
///
/// Converted into a `ModelResponse` by a single validating parse step
/// (`ModelResponse::from_generation`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Generated text, possibly empty
    pub text: String,
    /// Prompt tokens reported by the backend
    pub input_tokens: u32,
    /// Completion tokens reported by the backend
    pub output_tokens: u32,
    /// Provider-reported cost in USD, if the backend reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,
}

/// Coarse failure class used to pick a substitution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Quota or billing exhausted for this backend
    QuotaOrBilling,
    /// Throttled by the backend (HTTP 429 or equivalent)
    RateLimit,
    /// Anything else
    Other,
}

/// Error types for a single provider call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The backend refused the request as malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Billing or quota limit reached
    #[error("Quota or billing limit exhausted: {0}")]
    QuotaExceeded(String),

    /// Backend asked the caller to slow down
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// No answer within the call timeout, in seconds
    #[error("Call timed out after {0}s")]
    Timeout(u64),

    /// Any other HTTP error status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The output failed boundary validation
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// No provider is registered for the backend
    #[error("Backend not registered: {0}")]
    NotRegistered(String),
}

impl ProviderError {
    /// Whether the retry layer should attempt this call again.
    ///
    /// Auth/validation failures, quota exhaustion and 4xx responses other than
    /// 429 are permanent for the lifetime of a request.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Timeout(_) | Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Authentication(_)
            | Self::InvalidRequest(_)
            | Self::QuotaExceeded(_)
            | Self::MalformedResponse(_)
            | Self::NotRegistered(_) => false,
        }
    }

    /// Classify the failure for substitution and reporting.
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::QuotaExceeded(_) | Self::Http { status: 402, .. } => FailureKind::QuotaOrBilling,
            Self::RateLimited(_) | Self::Http { status: 429, .. } => FailureKind::RateLimit,
            _ => FailureKind::Other,
        }
    }
}

/// Text-generation capability consumed by the dispatch coordinator.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Generate a completion for the given request.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, ProviderError>;

    /// Whether the backend can currently be reached (credentials present,
    /// service enabled, ...). Checked once at workflow selection time.
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(ProviderError::RateLimited("slow down".into()).is_retryable());
        assert!(ProviderError::Timeout(30).is_retryable());
        assert!(ProviderError::Transport("connection reset".into()).is_retryable());
        assert!(ProviderError::Http { status: 503, message: "unavailable".into() }.is_retryable());
        assert!(ProviderError::Http { status: 429, message: "too many".into() }.is_retryable());
    }

    #[test]
    fn test_permanent_errors_are_not_retryable() {
        assert!(!ProviderError::Authentication("bad key".into()).is_retryable());
        assert!(!ProviderError::InvalidRequest("max_tokens".into()).is_retryable());
        assert!(!ProviderError::QuotaExceeded("monthly cap".into()).is_retryable());
        assert!(!ProviderError::Http { status: 404, message: "no model".into() }.is_retryable());
    }

    #[test]
    fn test_failure_kind_classification() {
        assert_eq!(
            ProviderError::QuotaExceeded("cap".into()).failure_kind(),
            FailureKind::QuotaOrBilling
        );
        assert_eq!(
            ProviderError::Http { status: 402, message: "payment".into() }.failure_kind(),
            FailureKind::QuotaOrBilling
        );
        assert_eq!(
            ProviderError::Http { status: 429, message: "slow".into() }.failure_kind(),
            FailureKind::RateLimit
        );
        assert_eq!(ProviderError::Timeout(5).failure_kind(), FailureKind::Other);
    }
}
