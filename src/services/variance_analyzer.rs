//! Minority claims, single-source claims, contradictions and severity.

use tracing::debug;

use super::text_analysis::{mentions_any, NEGATION_MARKERS};
use crate::domain::models::{
    AnalysisConfig, ConsensusReport, Contradiction, Disagreement, ModelResponse, Severity,
    UniqueClaim, VarianceReport,
};

/// Finds disagreements, unique claims and contradictions.
#[derive(Debug, Clone)]
pub struct VarianceAnalyzer {
    severity_medium_max: usize,
}

impl Default for VarianceAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl VarianceAnalyzer {
    /// Analyzer treating scores up to `severity_medium_max` as medium.
    pub const fn new(severity_medium_max: usize) -> Self {
        Self { severity_medium_max }
    }

    /// Analyzer from the `analysis` config section.
    pub const fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.severity_medium_max)
    }

    /// Classify every non-consensus claim and scan for contradictions.
    ///
    /// Claims at or above the threshold belong to consensus; of the rest, a
    /// single supporter makes a unique claim and anything else a disagreement.
    pub fn analyze(&self, consensus: &ConsensusReport, responses: &[ModelResponse]) -> VarianceReport {
        let mut disagreements = Vec::new();
        let mut unique_claims = Vec::new();

        for claim in &consensus.claims {
            let support = claim.support();
            if support >= consensus.threshold {
                continue;
            }
            if support == 1 {
                if let Some(backend) = claim.backends.iter().next() {
                    unique_claims.push(UniqueClaim {
                        key: claim.key.clone(),
                        claim: claim.text.clone(),
                        backend: backend.clone(),
                    });
                }
            } else {
                disagreements.push(Disagreement {
                    key: claim.key.clone(),
                    claim: claim.text.clone(),
                    backends: claim.backends.iter().cloned().collect(),
                    count: support,
                });
            }
        }

        let contradictions = Self::contradictions(responses);
        let score = disagreements.len() + contradictions.len();
        let severity = Severity::from_score(score, self.severity_medium_max);

        debug!(
            disagreements = disagreements.len(),
            unique = unique_claims.len(),
            contradictions = contradictions.len(),
            severity = severity.as_str(),
            "variance analyzed"
        );

        VarianceReport {
            severity,
            score,
            disagreements,
            unique_claims,
            contradictions,
        }
    }

    /// Every response pair where exactly one side uses the negation marker.
    pub fn contradictions(responses: &[ModelResponse]) -> Vec<Contradiction> {
        let negates: Vec<bool> = responses
            .iter()
            .map(|response| mentions_any(&response.text, NEGATION_MARKERS))
            .collect();

        let mut pairs = Vec::new();
        for i in 0..responses.len() {
            for j in (i + 1)..responses.len() {
                if negates[i] == negates[j] {
                    continue;
                }
                let (negating, affirming) = if negates[i] { (i, j) } else { (j, i) };
                pairs.push(Contradiction {
                    negating: responses[negating].backend.clone(),
                    affirming: responses[affirming].backend.clone(),
                });
            }
        }
        pairs.sort();
        pairs
    }
}
