//! Claims, consensus and variance records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::backend::BackendId;

/// A normalized text fragment and every distinct backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Claim {
    /// Equivalence key (case-folded, punctuation stripped)
    pub key: String,
    /// Representative original wording
    pub text: String,
    /// Distinct backends whose responses contain the claim
    pub backends: BTreeSet<BackendId>,
}

impl Claim {
    /// Number of distinct backends supporting this claim.
    pub fn support(&self) -> usize {
        self.backends.len()
    }
}

/// A claim that reached the majority threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConsensusItem {
    /// Equivalence key
    pub key: String,
    /// Representative wording
    pub claim: String,
    /// Agreeing backends / total responses, always in (0, 1]
    pub confidence: f64,
    /// Agreeing backends, sorted
    pub backends: Vec<BackendId>,
}

/// Output of the consensus calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConsensusReport {
    /// Claims at or above the threshold, ordered by confidence then key
    pub items: Vec<ConsensusItem>,
    /// Every distinct claim extracted, sorted by key
    pub claims: Vec<Claim>,
    /// Minimum support for consensus, `ceil(N/2)`
    pub threshold: usize,
    /// Responses the report was computed over
    pub total_responses: usize,
}

impl ConsensusReport {
    /// Share of distinct claims that reached consensus (0 when nothing was extracted).
    pub fn agreement_ratio(&self) -> f64 {
        if self.claims.is_empty() {
            0.0
        } else {
            self.items.len() as f64 / self.claims.len() as f64
        }
    }
}

/// Variance severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No disagreements or contradictions
    Low,
    /// A few
    Medium,
    /// Many
    High,
}

impl Severity {
    /// Low at 0, medium up to `medium_max`, high beyond.
    pub const fn from_score(score: usize, medium_max: usize) -> Self {
        if score == 0 {
            Self::Low
        } else if score <= medium_max {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A minority claim backed by more than one but fewer than threshold backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Disagreement {
    /// Equivalence key
    pub key: String,
    /// Representative wording
    pub claim: String,
    /// Supporting backends, sorted
    pub backends: Vec<BackendId>,
    /// Number of supporting backends
    pub count: usize,
}

/// A claim made by exactly one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UniqueClaim {
    /// Equivalence key
    pub key: String,
    /// Representative wording
    pub claim: String,
    /// The only backend that made the claim
    pub backend: BackendId,
}

/// Two responses where exactly one uses the negation marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Contradiction {
    /// Backend whose response contains the negation marker
    pub negating: BackendId,
    /// Backend whose response does not
    pub affirming: BackendId,
}

/// Everything outside consensus plus a severity level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VarianceReport {
    /// Level derived from `score`
    pub severity: Severity,
    /// |disagreements| + |contradictions|
    pub score: usize,
    /// Minority claims
    pub disagreements: Vec<Disagreement>,
    /// Single-backend claims
    pub unique_claims: Vec<UniqueClaim>,
    /// Negation-asymmetric response pairs
    pub contradictions: Vec<Contradiction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_cutoffs() {
        assert_eq!(Severity::from_score(0, 2), Severity::Low);
        assert_eq!(Severity::from_score(1, 2), Severity::Medium);
        assert_eq!(Severity::from_score(2, 2), Severity::Medium);
        assert_eq!(Severity::from_score(3, 2), Severity::High);
    }

    #[test]
    fn test_agreement_ratio_without_claims_is_zero() {
        let report = ConsensusReport {
            items: vec![],
            claims: vec![],
            threshold: 1,
            total_responses: 1,
        };
        assert!(report.agreement_ratio().abs() < f64::EPSILON);
    }
}
