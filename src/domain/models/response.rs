//! Validated backend responses.

use serde::{Deserialize, Serialize};

use super::backend::BackendId;
use crate::domain::ports::{GenerationOutput, ProviderError};

/// How a response entered the response set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseOrigin {
    /// Planned pass-1 roster slot
    #[default]
    Roster,
    /// Automatic substitute for a failed roster slot
    Substitute {
        /// Roster backend whose slot this response fills
        replaced: BackendId,
    },
    /// Extra call made to break a majority tie
    TieBreaker,
    /// Pass-2 consolidation over every pass-1 response
    Synthesis,
}

/// A single backend's answer, validated at the provider boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelResponse {
    /// Backend that produced the text
    pub backend: BackendId,
    /// Model the backend ran
    pub model_id: String,
    /// Non-empty response text
    pub text: String,
    /// Prompt tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Completion tokens
    #[serde(default)]
    pub output_tokens: u32,
    /// Cost in USD (provider-reported, or estimated from catalog pricing)
    #[serde(default)]
    pub cost_usd: f64,
    /// Which dispatch step produced the response
    #[serde(default)]
    pub origin: ResponseOrigin,
}

impl ModelResponse {
    /// Build a response directly, without going through a provider.
    pub fn new(backend: impl Into<BackendId>, model_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            model_id: model_id.into(),
            text: text.into(),
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            origin: ResponseOrigin::Roster,
        }
    }

    /// The single validating parse from raw provider output.
    ///
    /// `estimated_cost` fills in when the provider reports no cost.
    pub fn from_generation(
        backend: BackendId,
        model_id: String,
        origin: ResponseOrigin,
        output: GenerationOutput,
        estimated_cost: f64,
    ) -> Result<Self, ProviderError> {
        let text = output.text.trim();
        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(format!(
                "{backend} returned empty text"
            )));
        }

        let cost_usd = match output.cost_estimate {
            Some(cost) if cost.is_finite() && cost >= 0.0 => cost,
            Some(cost) => {
                return Err(ProviderError::MalformedResponse(format!(
                    "{backend} reported invalid cost {cost}"
                )));
            }
            None => estimated_cost,
        };

        Ok(Self {
            backend,
            model_id,
            text: text.to_string(),
            input_tokens: output.input_tokens,
            output_tokens: output.output_tokens,
            cost_usd,
            origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(text: &str, cost: Option<f64>) -> GenerationOutput {
        GenerationOutput {
            text: text.to_string(),
            input_tokens: 120,
            output_tokens: 340,
            cost_estimate: cost,
        }
    }

    #[test]
    fn test_from_generation_trims_and_keeps_reported_cost() {
        let response = ModelResponse::from_generation(
            BackendId::from("gpt-4o"),
            "gpt-4o".to_string(),
            ResponseOrigin::Roster,
            output("  Lithium prices fell in 2024.  ", Some(0.004)),
            1.0,
        )
        .unwrap();

        assert_eq!(response.text, "Lithium prices fell in 2024.");
        assert!((response.cost_usd - 0.004).abs() < f64::EPSILON);
        assert_eq!(response.output_tokens, 340);
    }

    #[test]
    fn test_from_generation_estimates_missing_cost() {
        let response = ModelResponse::from_generation(
            BackendId::from("deepseek"),
            "deepseek-chat".to_string(),
            ResponseOrigin::Roster,
            output("Answer.", None),
            0.0025,
        )
        .unwrap();
        assert!((response.cost_usd - 0.0025).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_generation_rejects_empty_text_and_bad_cost() {
        let empty = ModelResponse::from_generation(
            BackendId::from("deepseek"),
            "deepseek-chat".to_string(),
            ResponseOrigin::Roster,
            output("   ", None),
            0.0,
        );
        assert!(matches!(empty, Err(ProviderError::MalformedResponse(_))));

        let negative = ModelResponse::from_generation(
            BackendId::from("deepseek"),
            "deepseek-chat".to_string(),
            ResponseOrigin::Roster,
            output("fine", Some(-1.0)),
            0.0,
        );
        assert!(matches!(negative, Err(ProviderError::MalformedResponse(_))));
    }
}
