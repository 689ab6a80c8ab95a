//! Outlier detection records.

use serde::{Deserialize, Serialize};

use super::backend::BackendId;
use super::response::ModelResponse;

/// Why a flagged response diverges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierCategory {
    /// Numbers an order of magnitude away from the valid set
    Hallucination,
    /// A legitimate alternative view worth keeping
    ValuableDissent,
    /// Relies on historical or stale information
    Outdated,
    /// Answered a different question
    MisunderstoodQuery,
}

impl OutlierCategory {
    /// Fixed classification confidence per category.
    pub const fn confidence(&self) -> f64 {
        match self {
            Self::Hallucination => 0.9,
            Self::Outdated => 0.7,
            Self::MisunderstoodQuery => 0.75,
            Self::ValuableDissent => 0.6,
        }
    }

    /// Snake-case name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hallucination => "hallucination",
            Self::ValuableDissent => "valuable_dissent",
            Self::Outdated => "outdated",
            Self::MisunderstoodQuery => "misunderstood_query",
        }
    }

    /// Suggested handling of a response in this category.
    pub const fn recommendation(&self) -> &'static str {
        match self {
            Self::Hallucination => "Exclude this response from the final answer",
            Self::Outdated => "Note this response as historical context only",
            Self::MisunderstoodQuery => "Re-issue the query to this backend with a clarified prompt",
            Self::ValuableDissent => "Include this response as an alternative viewpoint",
        }
    }
}

/// Which detection pass flagged a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPass {
    /// Small-number z-score pass
    Numerical,
    /// Word-set similarity pass
    Lexical,
}

/// Classification of one flagged response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutlierClassification {
    /// Flagged backend
    pub backend: BackendId,
    /// Assigned category
    pub category: OutlierCategory,
    /// Fixed confidence of the category
    pub confidence: f64,
    /// Evidence behind the category
    pub reasoning: String,
    /// Suggested handling
    pub recommendation: String,
    /// Passes that flagged the response
    pub flagged_by: Vec<DetectionPass>,
    /// Leading excerpt of the flagged text
    pub excerpt: String,
}

/// Output of the outlier isolator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutlierReport {
    /// Responses passed on to consensus
    pub valid: Vec<ModelResponse>,
    /// Flagged responses, sorted by backend
    pub outliers: Vec<OutlierClassification>,
    /// Fewer than two responses: no statistics were computed
    pub short_circuited: bool,
    /// Every response was flagged, so the full raw set was restored
    pub fallback_applied: bool,
}

impl OutlierReport {
    /// Pass-through report that flags nothing.
    pub fn passthrough(responses: Vec<ModelResponse>, short_circuited: bool) -> Self {
        Self {
            valid: responses,
            outliers: Vec::new(),
            short_circuited,
            fallback_applied: false,
        }
    }

    /// Outliers assigned to `category`.
    pub fn outliers_in(&self, category: OutlierCategory) -> impl Iterator<Item = &OutlierClassification> {
        self.outliers.iter().filter(move |o| o.category == category)
    }
}
