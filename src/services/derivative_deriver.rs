//! Pattern rules over consensus and variance producing meta-insights.
//!
//! Rules are independent; any number may fire. Output order is fixed:
//! strong consensus, context dependence, single-source claims, ambiguous
//! question, value distribution, overconfidence.

use std::collections::BTreeSet;

use tracing::debug;

use super::text_analysis::{
    mean, mentions_any, numbers, std_dev, CERTAINTY_MARKERS, CONDITIONAL_MARKERS, HEDGING_MARKERS,
};
use crate::domain::models::{
    AnalysisConfig, BackendId, ConsensusReport, Derivative, DerivativeKind, ModelResponse, Severity,
    VarianceReport,
};

/// Applies the derivative rules in a fixed order.
#[derive(Debug, Clone)]
pub struct DerivativeDeriver {
    distribution_cv: f64,
}

impl Default for DerivativeDeriver {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl DerivativeDeriver {
    /// Deriver firing value distribution above `distribution_cv`.
    pub const fn new(distribution_cv: f64) -> Self {
        Self { distribution_cv }
    }

    /// Deriver from the `analysis` config section.
    pub const fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.distribution_cv)
    }

    /// Every derivative whose rule fires, in rule order.
    pub fn derive(
        &self,
        consensus: &ConsensusReport,
        variance: &VarianceReport,
        responses: &[ModelResponse],
    ) -> Vec<Derivative> {
        let kinds = [
            Self::strong_consensus(consensus, variance),
            Self::context_dependent(variance, responses),
            Self::single_source(variance),
            Self::ambiguous_question(variance),
            self.value_distribution(responses),
            Self::overconfidence(responses),
        ];

        let derivatives: Vec<Derivative> = kinds.into_iter().flatten().map(Derivative::from_kind).collect();
        debug!(count = derivatives.len(), "derivatives computed");
        derivatives
    }

    fn strong_consensus(consensus: &ConsensusReport, variance: &VarianceReport) -> Option<DerivativeKind> {
        (variance.severity == Severity::Low && !consensus.items.is_empty()).then(|| {
            DerivativeKind::StrongConsensus {
                consensus_items: consensus.items.len(),
            }
        })
    }

    fn context_dependent(variance: &VarianceReport, responses: &[ModelResponse]) -> Option<DerivativeKind> {
        if variance.severity != Severity::High {
            return None;
        }
        let conditional: BTreeSet<BackendId> = responses
            .iter()
            .filter(|response| mentions_any(&response.text, CONDITIONAL_MARKERS))
            .map(|response| response.backend.clone())
            .collect();
        (!conditional.is_empty()).then(|| DerivativeKind::ContextDependent {
            conditional_backends: conditional.into_iter().collect(),
        })
    }

    fn single_source(variance: &VarianceReport) -> Option<DerivativeKind> {
        (!variance.unique_claims.is_empty()).then(|| DerivativeKind::SingleSourceClaims {
            count: variance.unique_claims.len(),
        })
    }

    fn ambiguous_question(variance: &VarianceReport) -> Option<DerivativeKind> {
        (!variance.contradictions.is_empty()).then(|| DerivativeKind::AmbiguousQuestion {
            contradictions: variance.contradictions.len(),
        })
    }

    /// Every number across every response; fires when the population
    /// standard deviation exceeds the configured share of the mean.
    fn value_distribution(&self, responses: &[ModelResponse]) -> Option<DerivativeKind> {
        let mut values: Vec<f64> = responses.iter().flat_map(|r| numbers(&r.text)).collect();
        values.sort_by(f64::total_cmp);
        if values.len() < 2 {
            return None;
        }
        let avg = mean(&values)?;
        let spread = std_dev(&values, avg);
        if avg <= 0.0 || spread <= self.distribution_cv * avg {
            return None;
        }

        let (min, max) = (values[0], values[values.len() - 1]);
        Some(DerivativeKind::ValueDistribution {
            min,
            max,
            mean: avg,
            std_dev: spread,
        })
    }

    /// Exactly one certain response while more than half hedge.
    fn overconfidence(responses: &[ModelResponse]) -> Option<DerivativeKind> {
        let certain: Vec<&ModelResponse> = responses
            .iter()
            .filter(|response| mentions_any(&response.text, CERTAINTY_MARKERS))
            .collect();
        let hedging = responses
            .iter()
            .filter(|response| mentions_any(&response.text, HEDGING_MARKERS))
            .count();

        match certain.as_slice() {
            [only] if hedging * 2 > responses.len() => Some(DerivativeKind::Overconfidence {
                backend: only.backend.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ConsensusItem, Contradiction, Reliability, UniqueClaim};

    fn response(backend: &str, text: &str) -> ModelResponse {
        ModelResponse::new(backend, "model", text)
    }

    fn consensus(items: usize) -> ConsensusReport {
        ConsensusReport {
            items: (0..items)
                .map(|i| ConsensusItem {
                    key: format!("claim {i}"),
                    claim: format!("Claim {i}."),
                    confidence: 1.0,
                    backends: vec![BackendId::from("a")],
                })
                .collect(),
            claims: vec![],
            threshold: 1,
            total_responses: 1,
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

    fn kinds(derivatives: &[Derivative]) -> Vec<&DerivativeKind> {
        derivatives.iter().map(|d| &d.kind).collect()
    }

    #[test]
    fn test_strong_consensus_needs_low_severity_and_items() {
        let deriver = DerivativeDeriver::default();
        let responses = [response("a", "Plain text.")];

        let fired = deriver.derive(&consensus(2), &variance(Severity::Low), &responses);
        assert_eq!(kinds(&fired), vec![&DerivativeKind::StrongConsensus { consensus_items: 2 }]);
        assert_eq!(fired[0].reliability, Reliability::High);
        assert!(!fired[0].actionable);

        assert!(deriver.derive(&consensus(0), &variance(Severity::Low), &responses).is_empty());
        assert!(deriver.derive(&consensus(2), &variance(Severity::Medium), &responses).is_empty());
    }

    #[test]
    fn test_context_dependent_on_high_severity() {
        let deriver = DerivativeDeriver::default();
        let responses = [
            response("b", "It depends on the jurisdiction."),
            response("a", "The rule applies everywhere."),
        ];

        let fired = deriver.derive(&consensus(0), &variance(Severity::High), &responses);
        assert_eq!(
            kinds(&fired),
            vec![&DerivativeKind::ContextDependent {
                conditional_backends: vec![BackendId::from("b")],
            }]
        );
        assert!(fired[0].actionable);
    }

    #[test]
    fn test_single_source_and_ambiguous_question() {
        let deriver = DerivativeDeriver::default();
        let mut report = variance(Severity::Medium);
        report.unique_claims.push(UniqueClaim {
            key: "k".into(),
            claim: "Claim.".into(),
            backend: BackendId::from("a"),
        });
        report.contradictions.push(Contradiction {
            negating: BackendId::from("a"),
            affirming: BackendId::from("b"),
        });

        let fired = deriver.derive(&consensus(0), &report, &[]);
        assert_eq!(
            kinds(&fired),
            vec![
                &DerivativeKind::SingleSourceClaims { count: 1 },
                &DerivativeKind::AmbiguousQuestion { contradictions: 1 },
            ]
        );
    }

    #[test]
    fn test_value_distribution_fires_on_wide_spread() {
        let deriver = DerivativeDeriver::default();
        let wide = [response("a", "About 10 units."), response("b", "About 40 units.")];
        let fired = deriver.derive(&consensus(0), &variance(Severity::Medium), &wide);
        match &fired[0].kind {
            DerivativeKind::ValueDistribution { min, max, mean, std_dev } => {
                assert!((min - 10.0).abs() < f64::EPSILON);
                assert!((max - 40.0).abs() < f64::EPSILON);
                assert!((mean - 25.0).abs() < f64::EPSILON);
                assert!((std_dev - 15.0).abs() < 1e-9);
            }
            other => panic!("unexpected derivative {other:?}"),
        }

        let narrow = [response("a", "About 10 units."), response("b", "About 11 units.")];
        assert!(deriver.derive(&consensus(0), &variance(Severity::Medium), &narrow).is_empty());
    }

    #[test]
    fn test_value_distribution_ignores_response_order() {
        let deriver = DerivativeDeriver::default();
        let mut responses = vec![
            response("a", "Roughly 0.1 of units."),
            response("b", "Roughly 0.2 of units."),
            response("c", "Roughly 0.3 of units."),
        ];
        let forward = deriver.derive(&consensus(0), &variance(Severity::Medium), &responses);
        responses.reverse();
        let reversed = deriver.derive(&consensus(0), &variance(Severity::Medium), &responses);

        assert_eq!(forward.len(), 1);
        // 0.1 + 0.2 + 0.3 and 0.3 + 0.2 + 0.1 differ in the last bit unsorted
        assert_eq!(kinds(&forward), kinds(&reversed));
    }

    #[test]
    fn test_overconfidence_flags_the_lone_certain_response() {
        let deriver = DerivativeDeriver::default();
        let responses = [
            response("a", "This will definitely happen."),
            response("b", "This might happen."),
            response("c", "It could possibly happen."),
        ];
        let fired = deriver.derive(&consensus(0), &variance(Severity::Medium), &responses);
        assert_eq!(
            kinds(&fired),
            vec![&DerivativeKind::Overconfidence {
                backend: BackendId::from("a"),
            }]
        );

        // not when most responses commit
        let responses = [
            response("a", "This will definitely happen."),
            response("b", "This might happen."),
            response("c", "This will happen."),
            response("d", "This happens."),
        ];
        assert!(deriver.derive(&consensus(0), &variance(Severity::Medium), &responses).is_empty());
    }
}
