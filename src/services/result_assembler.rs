//! Merges every analysis output into one `ResearchResult`.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::cost_tracker::CostTracker;
use crate::domain::models::{
    AnalysisConfig, BackendId, ConfidenceTier, ConfirmedFinding, ConsensusReport, Derivative,
    DisputedFinding, ModelResponse, OutlierCategory, OutlierReport, ResearchDepth, ResearchResult,
    Severity, SlotFailure, Timing, UniqueFinding, VarianceReport,
};

const AGREEMENT_WEIGHT: f64 = 70.0;
const STABILITY_WEIGHT: f64 = 30.0;

const HIGH_VARIANCE_CAUTION: &str =
    "Caution: the models disagree substantially on this topic; treat these findings as provisional.";

/// Everything the assembler merges.
#[derive(Debug, Clone)]
pub struct AssemblyInput {
    /// Research topic
    pub topic: String,
    /// Requested depth
    pub depth: ResearchDepth,
    /// Every response dispatch produced, outliers included
    pub responses: Vec<ModelResponse>,
    /// Failed slots
    pub failures: Vec<SlotFailure>,
    /// Outlier isolation outcome
    pub outliers: OutlierReport,
    /// Consensus over the valid set
    pub consensus: ConsensusReport,
    /// Variance over the valid set
    pub variance: VarianceReport,
    /// Fired derivatives
    pub derivatives: Vec<Derivative>,
    /// Phase timing
    pub timing: Timing,
}

/// Merges analysis outputs into a `ResearchResult`.
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    summary_claims: usize,
}

impl Default for ResultAssembler {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl ResultAssembler {
    /// Assembler summarizing at most `summary_claims` claims.
    pub const fn new(summary_claims: usize) -> Self {
        Self { summary_claims }
    }

    /// Assembler from the `analysis` config section.
    pub const fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.summary_claims)
    }

    /// Build the final result.
    pub fn assemble(&self, input: AssemblyInput) -> ResearchResult {
        let confirmed = Self::confirmed(&input.consensus);
        let disputed = input
            .outliers
            .outliers_in(OutlierCategory::ValuableDissent)
            .map(|outlier| DisputedFinding {
                backend: outlier.backend.clone(),
                excerpt: outlier.excerpt.clone(),
                reasoning: outlier.reasoning.clone(),
            })
            .collect();
        let unique = input
            .variance
            .unique_claims
            .iter()
            .map(|claim| UniqueFinding {
                backend: claim.backend.clone(),
                claim: claim.claim.clone(),
            })
            .collect();

        let models_used: Vec<BackendId> = input
            .responses
            .iter()
            .map(|response| response.backend.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        ResearchResult {
            id: Uuid::new_v4(),
            confidence_score: confidence_score(&input.consensus, &input.variance),
            summary: self.summary(&confirmed, &input.consensus, input.variance.severity),
            cost: CostTracker::summarize(&input.responses),
            topic: input.topic,
            depth: input.depth,
            models_used,
            responses: input.responses,
            failures: input.failures,
            consensus: input.consensus,
            variance: input.variance,
            derivatives: input.derivatives,
            outliers: input.outliers,
            confirmed,
            disputed,
            unique,
            timing: input.timing,
        }
    }

    /// Consensus items as findings, most confident first.
    fn confirmed(consensus: &ConsensusReport) -> Vec<ConfirmedFinding> {
        let mut confirmed: Vec<ConfirmedFinding> = consensus
            .items
            .iter()
            .map(|item| ConfirmedFinding {
                claim: item.claim.clone(),
                confidence: item.confidence,
                tier: ConfidenceTier::from_confidence(item.confidence),
                backends: item.backends.clone(),
            })
            .collect();
        confirmed.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.claim.cmp(&b.claim))
        });
        confirmed
    }

    fn summary(&self, confirmed: &[ConfirmedFinding], consensus: &ConsensusReport, severity: Severity) -> String {
        let mut summary = if confirmed.is_empty() {
            format!(
                "No consensus reached across {} models.",
                consensus.total_responses
            )
        } else {
            confirmed
                .iter()
                .take(self.summary_claims)
                .map(|finding| finding.claim.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        };

        if severity == Severity::High {
            summary.push_str("\n\n");
            summary.push_str(HIGH_VARIANCE_CAUTION);
        }
        summary
    }
}

/// 0-100 system confidence: rises with the share of claims in consensus and
/// falls with variance severity.
pub fn confidence_score(consensus: &ConsensusReport, variance: &VarianceReport) -> u8 {
    let severity_weight = match variance.severity {
        Severity::Low => 0.0,
        Severity::Medium => 0.5,
        Severity::High => 1.0,
    };
    let score = AGREEMENT_WEIGHT.mul_add(
        consensus.agreement_ratio(),
        STABILITY_WEIGHT * (1.0 - severity_weight),
    );
    score.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Claim, ConsensusItem, UniqueClaim};
    use chrono::Utc;

    fn item(claim: &str, confidence: f64) -> ConsensusItem {
        ConsensusItem {
            key: claim.to_lowercase(),
            claim: claim.to_string(),
            confidence,
            backends: vec![BackendId::from("a")],
        }
    }

    fn claim(key: &str) -> Claim {
        Claim {
            key: key.to_string(),
            text: key.to_string(),
            backends: BTreeSet::from([BackendId::from("a")]),
        }
    }

    fn consensus(items: Vec<ConsensusItem>, claims: usize) -> ConsensusReport {
        ConsensusReport {
            items,
            claims: (0..claims).map(|i| claim(&format!("claim {i}"))).collect(),
            threshold: 2,
            total_responses: 3,
        }
    }

    fn variance(severity: Severity) -> VarianceReport {
        VarianceReport {
            severity,
            score: 0,
            disagreements: vec![],
            unique_claims: vec![],
            contradictions: vec![],
        }
    }

    fn input(consensus: ConsensusReport, variance: VarianceReport) -> AssemblyInput {
        let responses = vec![
            ModelResponse {
                cost_usd: 0.01,
                ..ModelResponse::new("b", "m", "text")
            },
            ModelResponse {
                cost_usd: 0.02,
                ..ModelResponse::new("a", "m", "text")
            },
        ];
        let now = Utc::now();
        AssemblyInput {
            topic: "topic".to_string(),
            depth: ResearchDepth::Standard,
            outliers: OutlierReport::passthrough(responses.clone(), false),
            responses,
            failures: vec![],
            consensus,
            variance,
            derivatives: vec![],
            timing: Timing {
                started_at: now,
                completed_at: now,
                dispatch_ms: 0,
                analysis_ms: 0,
            },
        }
    }

    #[test]
    fn test_confidence_score_formula() {
        let full = consensus(vec![item("A.", 1.0)], 1);
        assert_eq!(confidence_score(&full, &variance(Severity::Low)), 100);
        assert_eq!(confidence_score(&full, &variance(Severity::Medium)), 85);
        assert_eq!(confidence_score(&full, &variance(Severity::High)), 70);

        let half = consensus(vec![item("A.", 1.0)], 2);
        assert_eq!(confidence_score(&half, &variance(Severity::Low)), 65);

        let none = consensus(vec![], 0);
        assert_eq!(confidence_score(&none, &variance(Severity::High)), 0);
    }

    #[test]
    fn test_confidence_score_is_monotonic_in_severity() {
        let report = consensus(vec![item("A.", 0.67)], 3);
        let low = confidence_score(&report, &variance(Severity::Low));
        let medium = confidence_score(&report, &variance(Severity::Medium));
        let high = confidence_score(&report, &variance(Severity::High));
        assert!(low > medium && medium > high);
    }

    #[test]
    fn test_summary_takes_top_three_by_confidence() {
        let report = consensus(
            vec![
                item("Fourth.", 0.67),
                item("First.", 1.0),
                item("Second.", 1.0),
                item("Third.", 0.67),
            ],
            4,
        );
        let result = ResultAssembler::default().assemble(input(report, variance(Severity::Low)));
        assert_eq!(result.summary, "First.\nSecond.\nFourth.");
        assert_eq!(result.confirmed[0].tier, ConfidenceTier::High);
        assert_eq!(result.confirmed[3].tier, ConfidenceTier::Medium);
    }

    #[test]
    fn test_summary_without_consensus_and_high_variance_caution() {
        let result = ResultAssembler::default()
            .assemble(input(consensus(vec![], 2), variance(Severity::High)));
        assert!(result.summary.starts_with("No consensus reached across 3 models."));
        assert!(result.summary.ends_with(HIGH_VARIANCE_CAUTION));
    }

    #[test]
    fn test_models_used_and_cost() {
        let mut report = variance(Severity::Medium);
        report.unique_claims.push(UniqueClaim {
            key: "k".into(),
            claim: "Only b said it.".into(),
            backend: BackendId::from("b"),
        });
        let result = ResultAssembler::default().assemble(input(consensus(vec![], 1), report));

        assert_eq!(result.models_used, vec![BackendId::from("a"), BackendId::from("b")]);
        assert!((result.cost.total_usd - 0.03).abs() < 1e-9);
        assert_eq!(result.unique.len(), 1);
        assert!(result.disputed.is_empty());
    }
}
