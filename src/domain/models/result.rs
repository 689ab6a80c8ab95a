//! The assembled research report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::{ConsensusReport, VarianceReport};
use super::backend::BackendId;
use super::derivative::Derivative;
use super::outlier::OutlierReport;
use super::request::ResearchDepth;
use super::response::ModelResponse;
use crate::domain::ports::FailureKind;

/// Confidence tier of a confirmed finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    /// Confidence above 0.8
    High,
    /// Confidence above 0.5
    Medium,
    /// Everything else
    Low,
}

impl ConfidenceTier {
    /// High above 0.8, medium above 0.5, low otherwise.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.8 {
            Self::High
        } else if confidence > 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A consensus claim as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConfirmedFinding {
    /// Claim wording
    pub claim: String,
    /// Agreeing share of responses
    pub confidence: f64,
    /// Bucketed confidence
    pub tier: ConfidenceTier,
    /// Agreeing backends
    pub backends: Vec<BackendId>,
}

/// A response set aside as valuable dissent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DisputedFinding {
    /// Dissenting backend
    pub backend: BackendId,
    /// Leading part of the response
    pub excerpt: String,
    /// Why it was flagged
    pub reasoning: String,
}

/// A claim only one backend made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UniqueFinding {
    /// Sole source
    pub backend: BackendId,
    /// Claim wording
    pub claim: String,
}

/// A roster slot that produced nothing, even after substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SlotFailure {
    /// Backend originally assigned to the slot
    pub backend: BackendId,
    /// Failure classification
    pub kind: FailureKind,
    /// Error message of the last attempt
    pub error: String,
    /// Substitute attempted for this slot, if one was available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitute: Option<BackendId>,
    /// Whether the substitute produced a response
    pub recovered: bool,
}

/// Actual spend for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CostBreakdown {
    /// Sum over every successful call
    pub total_usd: f64,
    /// Spend per backend
    pub by_backend: BTreeMap<BackendId, f64>,
    /// Prompt tokens across all calls
    pub input_tokens: u64,
    /// Completion tokens across all calls
    pub output_tokens: u64,
}

/// Wall-clock timestamps and phase durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Timing {
    /// When the request started
    pub started_at: DateTime<Utc>,
    /// When the result was assembled
    pub completed_at: DateTime<Utc>,
    /// Time spent in dispatch
    pub dispatch_ms: u64,
    /// Time spent in the analysis pipeline
    pub analysis_ms: u64,
}

/// Everything a research request produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResearchResult {
    /// Unique result id
    pub id: Uuid,
    /// Research topic
    pub topic: String,
    /// Requested depth
    pub depth: ResearchDepth,
    /// Backends that contributed at least one response
    pub models_used: Vec<BackendId>,
    /// Every response collected, including outliers
    pub responses: Vec<ModelResponse>,
    /// Slots that failed
    pub failures: Vec<SlotFailure>,
    /// Consensus over the valid set
    pub consensus: ConsensusReport,
    /// Variance over the valid set
    pub variance: VarianceReport,
    /// Pattern insights, in rule order
    pub derivatives: Vec<Derivative>,
    /// Outlier isolation outcome
    pub outliers: OutlierReport,
    /// Consensus findings
    pub confirmed: Vec<ConfirmedFinding>,
    /// Valuable dissent
    pub disputed: Vec<DisputedFinding>,
    /// Single-source findings
    pub unique: Vec<UniqueFinding>,
    /// 0-100
    pub confidence_score: u8,
    /// Plain-text summary
    pub summary: String,
    /// Actual spend
    pub cost: CostBreakdown,
    /// Timing
    pub timing: Timing,
}

impl ResearchResult {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a result written by [`Self::to_json`].
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(ConfidenceTier::from_confidence(1.0), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_confidence(0.81), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_confidence(0.8), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_confidence(0.51), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_confidence(0.5), ConfidenceTier::Low);
    }
}
