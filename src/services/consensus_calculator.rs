//! Claim extraction and majority consensus.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::text_analysis::{claim_key, fragments};
use crate::domain::errors::{DomainResult, Phase, ResearchError};
use crate::domain::models::{AnalysisConfig, BackendId, Claim, ConsensusItem, ConsensusReport, ModelResponse};

/// Groups response fragments into claims and finds the majority ones.
///
/// Output depends only on the multiset of (backend, text) pairs, never on
/// response order: claims are keyed in a sorted map, supporters are kept in
/// sorted sets, and a claim's display text is its smallest original wording.
#[derive(Debug, Clone)]
pub struct ConsensusCalculator {
    min_claim_chars: usize,
}

impl Default for ConsensusCalculator {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl ConsensusCalculator {
    /// Calculator ignoring claim keys shorter than `min_claim_chars`.
    pub const fn new(min_claim_chars: usize) -> Self {
        Self { min_claim_chars }
    }

    /// Calculator from the `analysis` config section.
    pub const fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.min_claim_chars)
    }

    /// Majority threshold for `n` responses: `ceil(n / 2)`.
    pub const fn threshold(n: usize) -> usize {
        n.div_ceil(2)
    }

    /// Every distinct claim across the responses, sorted by key.
    pub fn extract_claims(&self, responses: &[ModelResponse]) -> Vec<Claim> {
        let mut grouped: BTreeMap<String, (String, BTreeSet<BackendId>)> = BTreeMap::new();

        for response in responses {
            for fragment in fragments(&response.text) {
                let key = claim_key(fragment);
                if key.chars().count() < self.min_claim_chars {
                    continue;
                }
                let (text, backends) = grouped
                    .entry(key)
                    .or_insert_with(|| (fragment.to_string(), BTreeSet::new()));
                if fragment < text.as_str() {
                    *text = fragment.to_string();
                }
                backends.insert(response.backend.clone());
            }
        }

        grouped
            .into_iter()
            .map(|(key, (text, backends))| Claim { key, text, backends })
            .collect()
    }

    /// Compute consensus over an already outlier-filtered response set.
    ///
    /// # Errors
    /// `ConsensusComputation` when `responses` is empty.
    pub fn calculate(&self, topic: &str, responses: &[ModelResponse]) -> DomainResult<ConsensusReport> {
        let total = responses.len();
        if total == 0 {
            return Err(ResearchError::ConsensusComputation {
                phase: Phase::Consensus,
                topic: topic.to_string(),
                cause: "no responses to compute consensus over".to_string(),
            });
        }

        let threshold = Self::threshold(total);
        let claims = self.extract_claims(responses);

        let mut items: Vec<ConsensusItem> = claims
            .iter()
            .filter(|claim| claim.support() >= threshold)
            .map(|claim| ConsensusItem {
                key: claim.key.clone(),
                claim: claim.text.clone(),
                confidence: claim.support() as f64 / total as f64,
                backends: claim.backends.iter().cloned().collect(),
            })
            .collect();
        items.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.key.cmp(&b.key))
        });

        debug!(
            responses = total,
            claims = claims.len(),
            consensus = items.len(),
            threshold,
            "consensus computed"
        );

        Ok(ConsensusReport {
            items,
            claims,
            threshold,
            total_responses: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(backend: &str, text: &str) -> ModelResponse {
        ModelResponse::new(backend, "model", text)
    }

    #[test]
    fn test_threshold_is_ceiling_of_half() {
        assert_eq!(ConsensusCalculator::threshold(1), 1);
        assert_eq!(ConsensusCalculator::threshold(2), 1);
        assert_eq!(ConsensusCalculator::threshold(3), 2);
        assert_eq!(ConsensusCalculator::threshold(4), 2);
        assert_eq!(ConsensusCalculator::threshold(5), 3);
    }

    #[test]
    fn test_equivalent_fragments_group_into_one_claim() {
        let calculator = ConsensusCalculator::default();
        let responses = vec![
            response("a", "Water boils at 100 degrees Celsius. Ice is cold."),
            response("b", "water boils at 100 degrees celsius!"),
            response("c", "Something else entirely happens here."),
        ];

        let report = calculator.calculate("boiling", &responses).unwrap();
        assert_eq!(report.threshold, 2);
        assert_eq!(report.items.len(), 1);

        let item = &report.items[0];
        assert_eq!(item.claim, "Water boils at 100 degrees Celsius.");
        assert!((item.confidence - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(item.backends, vec![BackendId::from("a"), BackendId::from("b")]);
    }

    #[test]
    fn test_short_fragments_are_discarded() {
        let calculator = ConsensusCalculator::default();
        let claims = calculator.extract_claims(&[response("a", "Yes. No. Maybe so.")]);
        assert!(claims.is_empty());
    }

    #[test]
    fn test_repeats_from_one_backend_count_once() {
        let calculator = ConsensusCalculator::default();
        let responses = vec![
            response("a", "The market grew strongly last year. The market grew strongly last year."),
            response("b", "Completely unrelated sentence about weather."),
            response("c", "Another unrelated sentence about sports teams."),
        ];
        let report = calculator.calculate("market", &responses).unwrap();
        assert!(report.items.is_empty());
        let claim = report.claims.iter().find(|c| c.key.starts_with("the market")).unwrap();
        assert_eq!(claim.support(), 1);
    }

    #[test]
    fn test_empty_response_set_is_an_error() {
        let result = ConsensusCalculator::default().calculate("topic", &[]);
        assert!(matches!(
            result,
            Err(ResearchError::ConsensusComputation { phase: Phase::Consensus, .. })
        ));
    }

    #[test]
    fn test_single_response_is_its_own_consensus() {
        let report = ConsensusCalculator::default()
            .calculate("topic", &[response("a", "Only one model answered this question.")])
            .unwrap();
        assert_eq!(report.items.len(), 1);
        assert!((report.items[0].confidence - 1.0).abs() < f64::EPSILON);
    }
}
