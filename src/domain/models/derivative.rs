//! Meta-insights derived from consensus and variance patterns.

use serde::{Deserialize, Serialize};

use super::backend::BackendId;

/// How far a derivative can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    /// Backed by broad agreement
    High,
    /// Suggestive
    Medium,
    /// Weak signal
    Low,
}

/// The pattern that fired, with the evidence it fired on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DerivativeKind {
    /// Low variance and at least one consensus claim
    StrongConsensus {
        /// Number of consensus claims
        consensus_items: usize,
    },
    /// High variance while some responses hedge on context
    ContextDependent {
        /// Backends whose responses use conditional language
        conditional_backends: Vec<BackendId>,
    },
    /// Claims only one backend made
    SingleSourceClaims {
        /// Number of single-source claims
        count: usize,
    },
    /// Responses contradict each other
    AmbiguousQuestion {
        /// Number of contradicting pairs
        contradictions: usize,
    },
    /// Numbers across responses spread too widely to be a single value
    ValueDistribution {
        /// Smallest number seen
        min: f64,
        /// Largest number seen
        max: f64,
        /// Mean of every number
        mean: f64,
        /// Population standard deviation
        std_dev: f64,
    },
    /// One certain response among mostly hedging ones
    Overconfidence {
        /// The lone certain backend
        backend: BackendId,
    },
}

/// A derived insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Derivative {
    /// Pattern and evidence
    pub kind: DerivativeKind,
    /// Human-readable description
    pub message: String,
    /// Trust level
    pub reliability: Reliability,
    /// Whether the caller should act on it
    pub actionable: bool,
    /// Suggested action, for actionable derivatives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Derivative {
    /// Derive message, reliability and recommendation from the pattern.
    pub fn from_kind(kind: DerivativeKind) -> Self {
        let (message, reliability, recommendation) = match &kind {
            DerivativeKind::StrongConsensus { consensus_items } => (
                format!("Strong consensus: models agree on {consensus_items} claim(s) with little variance"),
                Reliability::High,
                None,
            ),
            DerivativeKind::ContextDependent { conditional_backends } => (
                format!(
                    "Context-dependent answer: models disagree and {} response(s) use conditional language",
                    conditional_backends.len()
                ),
                Reliability::Medium,
                Some("Specify the context or conditions you care about to get a definitive answer".to_string()),
            ),
            DerivativeKind::SingleSourceClaims { count } => (
                format!("{count} single-source claim(s) made by only one model"),
                Reliability::Low,
                Some("Verify single-source claims against an external reference before relying on them".to_string()),
            ),
            DerivativeKind::AmbiguousQuestion { contradictions } => (
                format!("Ambiguous question: {contradictions} contradicting response pair(s)"),
                Reliability::Medium,
                Some("Rephrase the question more narrowly to remove ambiguity".to_string()),
            ),
            DerivativeKind::ValueDistribution { min, max, mean, .. } => (
                format!(
                    "The value is a distribution, not a single number: observed {min} to {max} (mean {mean:.2})"
                ),
                Reliability::Medium,
                Some("Report the range rather than a point estimate".to_string()),
            ),
            DerivativeKind::Overconfidence { backend } => (
                format!("{backend} states its answer with certainty while most models hedge"),
                Reliability::Low,
                Some(format!("Treat the response from {backend} as suspect")),
            ),
        };

        let actionable = recommendation.is_some();
        Self {
            kind,
            message,
            reliability,
            actionable,
            recommendation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_consensus_is_not_actionable() {
        let derivative = Derivative::from_kind(DerivativeKind::StrongConsensus { consensus_items: 4 });
        assert_eq!(derivative.reliability, Reliability::High);
        assert!(!derivative.actionable);
        assert!(derivative.recommendation.is_none());
    }

    #[test]
    fn test_overconfidence_names_backend() {
        let derivative = Derivative::from_kind(DerivativeKind::Overconfidence {
            backend: BackendId::from("gpt-4o"),
        });
        assert!(derivative.actionable);
        assert!(derivative.message.contains("gpt-4o"));
    }

    #[test]
    fn test_kind_serializes_with_type_tag() {
        let derivative = Derivative::from_kind(DerivativeKind::SingleSourceClaims { count: 2 });
        let json = serde_json::to_value(&derivative).unwrap();
        assert_eq!(json["kind"]["type"], "single_source_claims");
        assert_eq!(json["kind"]["count"], 2);
    }
}
