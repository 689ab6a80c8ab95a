//! Property tests for the consensus, variance and outlier invariants.

use std::collections::BTreeSet;

use conclave::domain::models::{AnalysisConfig, ModelResponse};
use conclave::services::{confidence_score, ConsensusCalculator, OutlierIsolator, VarianceAnalyzer};
use proptest::prelude::*;

const SENTENCES: &[&str] = &[
    "Global demand for copper is rising steadily.",
    "Copper prices track industrial output closely.",
    "Recycling covers a third of copper supply.",
    "New mines take over a decade to open.",
    "Chile remains the largest copper producer.",
    "Copper is not a scarce metal in the crust.",
    "Electric vehicles use four times more copper.",
    "Short.",
    "Prices rose 12 percent last year.",
    "Prices rose 40 percent last year.",
];

/// Response sets of 1-6 responses, each a handful of pooled sentences,
/// with distinct backend ids.
fn response_sets() -> impl Strategy<Value = Vec<ModelResponse>> {
    prop::collection::vec(
        prop::collection::vec(0..SENTENCES.len(), 1..5),
        1..7,
    )
    .prop_map(|picks| {
        picks
            .into_iter()
            .enumerate()
            .map(|(idx, sentences)| {
                let text = sentences
                    .into_iter()
                    .map(|i| SENTENCES[i])
                    .collect::<Vec<_>>()
                    .join(" ");
                ModelResponse::new(format!("model-{idx}"), "model", text)
            })
            .collect()
    })
}

proptest! {
    /// Property: consensus, disagreement and unique claims partition the
    /// distinct claims
    #[test]
    fn prop_claims_are_partitioned(responses in response_sets()) {
        let consensus = ConsensusCalculator::default().calculate("copper", &responses).unwrap();
        let variance = VarianceAnalyzer::default().analyze(&consensus, &responses);

        let mut seen = BTreeSet::new();
        let keys = consensus.items.iter().map(|i| i.key.clone())
            .chain(variance.disagreements.iter().map(|d| d.key.clone()))
            .chain(variance.unique_claims.iter().map(|u| u.key.clone()));
        for key in keys {
            prop_assert!(seen.insert(key.clone()), "claim {} classified twice", key);
        }
        let all: BTreeSet<String> = consensus.claims.iter().map(|c| c.key.clone()).collect();
        prop_assert_eq!(seen, all);
    }

    /// Property: consensus confidence lies in (0, 1] and meets the threshold
    #[test]
    fn prop_consensus_bounds(responses in response_sets()) {
        let consensus = ConsensusCalculator::default().calculate("copper", &responses).unwrap();
        let total = responses.len();
        prop_assert_eq!(consensus.threshold, total.div_ceil(2));

        for item in &consensus.items {
            prop_assert!(item.confidence > 0.0 && item.confidence <= 1.0);
            prop_assert!(item.backends.len() >= consensus.threshold);
            let expected = item.backends.len() as f64 / total as f64;
            prop_assert!((item.confidence - expected).abs() < 1e-12);
        }

        let variance = VarianceAnalyzer::default().analyze(&consensus, &responses);
        prop_assert!(confidence_score(&consensus, &variance) <= 100);
    }

    /// Property: analysis is idempotent
    #[test]
    fn prop_consensus_is_idempotent(responses in response_sets()) {
        let calculator = ConsensusCalculator::default();
        let first = calculator.calculate("copper", &responses).unwrap();
        let second = calculator.calculate("copper", &responses).unwrap();
        prop_assert_eq!(&first, &second);

        let analyzer = VarianceAnalyzer::default();
        prop_assert_eq!(analyzer.analyze(&first, &responses), analyzer.analyze(&second, &responses));
    }

    /// Property: response order does not change any report
    #[test]
    fn prop_reports_ignore_response_order(responses in response_sets()) {
        let mut reversed = responses.clone();
        reversed.reverse();

        let calculator = ConsensusCalculator::default();
        let forward = calculator.calculate("copper", &responses).unwrap();
        let backward = calculator.calculate("copper", &reversed).unwrap();
        prop_assert_eq!(&forward, &backward);

        let analyzer = VarianceAnalyzer::default();
        prop_assert_eq!(
            analyzer.analyze(&forward, &responses),
            analyzer.analyze(&backward, &reversed)
        );

        let isolator = OutlierIsolator::new(AnalysisConfig::default());
        let a = isolator.isolate(responses);
        let b = isolator.isolate(reversed);
        let valid_a: BTreeSet<String> = a.valid.iter().map(|r| r.backend.to_string()).collect();
        let valid_b: BTreeSet<String> = b.valid.iter().map(|r| r.backend.to_string()).collect();
        prop_assert_eq!(valid_a, valid_b);
        prop_assert_eq!(a.outliers, b.outliers);
    }

    /// Property: outlier isolation never empties a non-empty response set
    #[test]
    fn prop_outlier_isolation_keeps_a_valid_response(responses in response_sets()) {
        let total = responses.len();
        let report = OutlierIsolator::new(AnalysisConfig::default()).isolate(responses);

        prop_assert!(!report.valid.is_empty());
        prop_assert_eq!(report.valid.len() + report.outliers.len(), total);
        if total < 2 {
            prop_assert!(report.short_circuited);
        }
    }
}
