//! Numeric and lexical outlier detection with per-response classification.
//!
//! Two independent passes flag responses:
//! - **Numerical**: per-response mean of small numbers (below the ceiling),
//!   compared by z-score. Sets of four or more score each mean against the
//!   others (leave-one-out); smaller sets use the population of all means.
//! - **Lexical**: average pairwise Jaccard similarity of word sets.
//!
//! Flagged responses are classified against the unflagged (valid) set. If the
//! passes together flag every response, the full set is restored unflagged.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::text_analysis::{excerpt, is_temporal, jaccard, mean, numbers, std_dev, word_set};
use crate::domain::models::{
    AnalysisConfig, DetectionPass, ModelResponse, OutlierCategory, OutlierClassification,
    OutlierReport,
};

const EXCERPT_CHARS: usize = 160;
/// Fewest other means a leave-one-out score is taken against.
const LEAVE_ONE_OUT_MIN: usize = 3;

/// Separates divergent responses before consensus.
#[derive(Debug, Clone)]
pub struct OutlierIsolator {
    config: AnalysisConfig,
}

impl Default for OutlierIsolator {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl OutlierIsolator {
    /// Isolator with the given thresholds.
    pub const fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Split responses into a valid set and classified outliers.
    pub fn isolate(&self, responses: Vec<ModelResponse>) -> OutlierReport {
        if responses.len() < 2 {
            debug!(responses = responses.len(), "too few responses for outlier detection");
            return OutlierReport::passthrough(responses, true);
        }

        let numeric = self.numeric_pass(&responses);
        let lexical = self.lexical_pass(&responses);
        let flagged: BTreeSet<usize> = numeric.union(&lexical).copied().collect();

        if flagged.is_empty() {
            return OutlierReport::passthrough(responses, false);
        }
        if flagged.len() == responses.len() {
            warn!(
                responses = responses.len(),
                "every response was flagged, keeping the full set"
            );
            return OutlierReport {
                fallback_applied: true,
                ..OutlierReport::passthrough(responses, false)
            };
        }

        let (valid, suspects): (Vec<_>, Vec<_>) = responses
            .into_iter()
            .enumerate()
            .partition(|(idx, _)| !flagged.contains(idx));
        let valid: Vec<ModelResponse> = valid.into_iter().map(|(_, response)| response).collect();

        let reference = ValidReference::new(&valid, self.config.min_word_len);
        let mut outliers: Vec<OutlierClassification> = suspects
            .into_iter()
            .map(|(idx, response)| {
                let mut passes = Vec::new();
                if numeric.contains(&idx) {
                    passes.push(DetectionPass::Numerical);
                }
                if lexical.contains(&idx) {
                    passes.push(DetectionPass::Lexical);
                }
                self.classify(&response, &reference, passes)
            })
            .collect();
        outliers.sort_by(|a, b| {
            a.backend
                .cmp(&b.backend)
                .then_with(|| a.excerpt.cmp(&b.excerpt))
        });

        info!(
            valid = valid.len(),
            outliers = outliers.len(),
            "outlier isolation complete"
        );

        OutlierReport {
            valid,
            outliers,
            short_circuited: false,
            fallback_applied: false,
        }
    }

    /// Indices whose small-number mean sits more than the z threshold away
    /// from the rest.
    ///
    /// With at least `LEAVE_ONE_OUT_MIN` other means, each mean is scored
    /// against the mean and spread of the others, falling back to the
    /// population spread when the others agree exactly. Smaller sets use the
    /// population mean and spread of every mean.
    fn numeric_pass(&self, responses: &[ModelResponse]) -> BTreeSet<usize> {
        let means: Vec<(usize, f64)> = responses
            .iter()
            .enumerate()
            .filter_map(|(idx, response)| {
                let small: Vec<f64> = numbers(&response.text)
                    .into_iter()
                    .filter(|value| *value < self.config.numeric_ceiling)
                    .collect();
                mean(&small).map(|m| (idx, m))
            })
            .collect();

        if means.len() < self.config.min_numeric_responses {
            return BTreeSet::new();
        }

        let mut all: Vec<f64> = means.iter().map(|(_, v)| *v).collect();
        all.sort_by(f64::total_cmp);
        let Some(population_mean) = mean(&all) else {
            return BTreeSet::new();
        };
        let population_sigma = std_dev(&all, population_mean);
        let leave_one_out = means.len() > LEAVE_ONE_OUT_MIN;

        means
            .iter()
            .filter(|(idx, value)| {
                let (center, sigma) = if leave_one_out {
                    let mut others: Vec<f64> = means
                        .iter()
                        .filter(|(other, _)| other != idx)
                        .map(|(_, v)| *v)
                        .collect();
                    others.sort_by(f64::total_cmp);
                    let Some(others_mean) = mean(&others) else {
                        return false;
                    };
                    let others_sigma = std_dev(&others, others_mean);
                    if others_sigma > f64::EPSILON {
                        (others_mean, others_sigma)
                    } else {
                        (others_mean, population_sigma)
                    }
                } else {
                    (population_mean, population_sigma)
                };
                if sigma <= f64::EPSILON {
                    return false;
                }
                let z = (value - center).abs() / sigma;
                let flagged = z > self.config.outlier_z_threshold;
                if flagged {
                    debug!(
                        backend = %responses[*idx].backend,
                        value,
                        center,
                        sigma,
                        z,
                        "numeric outlier"
                    );
                }
                flagged
            })
            .map(|(idx, _)| *idx)
            .collect()
    }

    /// Indices whose average Jaccard similarity to the others is below the
    /// threshold. A divergent pair keeps its more central member; larger sets
    /// that diverge entirely are all flagged and restored by the fallback.
    fn lexical_pass(&self, responses: &[ModelResponse]) -> BTreeSet<usize> {
        let sets: Vec<BTreeSet<String>> = responses
            .iter()
            .map(|response| word_set(&response.text, self.config.min_word_len))
            .collect();

        let averages: Vec<f64> = (0..sets.len())
            .map(|i| {
                // summed in sorted order so the result ignores response order
                let mut similarities: Vec<f64> = (0..sets.len())
                    .filter(|j| *j != i)
                    .map(|j| jaccard(&sets[i], &sets[j]))
                    .collect();
                similarities.sort_by(f64::total_cmp);
                similarities.iter().sum::<f64>() / similarities.len() as f64
            })
            .collect();

        let mut flagged: BTreeSet<usize> = averages
            .iter()
            .enumerate()
            .filter(|(_, avg)| **avg < self.config.lexical_similarity_threshold)
            .map(|(idx, _)| idx)
            .collect();

        if responses.len() == 2 && flagged.len() == 2 {
            let central = (0..responses.len()).min_by(|a, b| {
                averages[*b]
                    .total_cmp(&averages[*a])
                    .then_with(|| responses[*a].backend.cmp(&responses[*b].backend))
                    .then_with(|| responses[*a].text.cmp(&responses[*b].text))
            });
            if let Some(central) = central {
                debug!(
                    backend = %responses[central].backend,
                    "divergent pair, keeping the more central response"
                );
                flagged.remove(&central);
            }
        }

        flagged
    }

    fn classify(
        &self,
        response: &ModelResponse,
        reference: &ValidReference,
        flagged_by: Vec<DetectionPass>,
    ) -> OutlierClassification {
        let (category, reasoning) = self.categorize(response, reference);
        OutlierClassification {
            backend: response.backend.clone(),
            category,
            confidence: category.confidence(),
            reasoning,
            recommendation: category.recommendation().to_string(),
            flagged_by,
            excerpt: excerpt(&response.text, EXCERPT_CHARS),
        }
    }

    /// Precedence: hallucination, outdated, misunderstood query, dissent.
    fn categorize(&self, response: &ModelResponse, reference: &ValidReference) -> (OutlierCategory, String) {
        let response_mean = mean(&numbers(&response.text));
        if let (Some(value), Some(valid_mean)) = (response_mean, reference.numeric_mean) {
            if valid_mean > 0.0 {
                let ratio = value / valid_mean;
                let limit = self.config.hallucination_ratio;
                if ratio >= limit || ratio <= 1.0 / limit {
                    return (
                        OutlierCategory::Hallucination,
                        format!(
                            "Numeric values average {value:.2}, {ratio:.2}x the valid-set average of {valid_mean:.2}"
                        ),
                    );
                }
            }
        }

        if is_temporal(&response.text) {
            return (
                OutlierCategory::Outdated,
                "Response relies on historical or dated framing".to_string(),
            );
        }

        let words = word_set(&response.text, self.config.min_word_len);
        let overlap = if words.is_empty() {
            0.0
        } else {
            words.iter().filter(|w| reference.vocabulary.contains(*w)).count() as f64 / words.len() as f64
        };
        if overlap < self.config.misunderstood_overlap {
            return (
                OutlierCategory::MisunderstoodQuery,
                format!(
                    "Only {:.0}% of the response vocabulary appears in the other responses",
                    overlap * 100.0
                ),
            );
        }

        (
            OutlierCategory::ValuableDissent,
            format!(
                "Diverges from the other responses while sharing {:.0}% of their vocabulary",
                overlap * 100.0
            ),
        )
    }
}

/// Statistics of the valid set that flagged responses are judged against.
struct ValidReference {
    numeric_mean: Option<f64>,
    vocabulary: BTreeSet<String>,
}

impl ValidReference {
    fn new(valid: &[ModelResponse], min_word_len: usize) -> Self {
        let mut all_numbers: Vec<f64> = valid.iter().flat_map(|r| numbers(&r.text)).collect();
        all_numbers.sort_by(f64::total_cmp);
        let vocabulary = valid
            .iter()
            .flat_map(|r| word_set(&r.text, min_word_len))
            .collect();
        Self {
            numeric_mean: mean(&all_numbers),
            vocabulary,
        }
    }
}
