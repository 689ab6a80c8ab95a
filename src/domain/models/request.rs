//! Research request and depth presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::backend::{BackendCatalog, BackendId};
use crate::domain::errors::ResearchError;

const MAX_TOPIC_CHARS: usize = 8000;

/// Requested research depth, mapped to a workflow preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResearchDepth {
    /// One fast, cheap backend
    Flash,
    /// Two fast backends
    Quick,
    /// Three backends of mixed strength
    #[default]
    Standard,
    /// Four backends with a tie-breaker
    Deep,
    /// Five backends plus a synthesis pass
    DeepDive,
    /// Free-tier backends dispatched sequentially to respect per-minute quotas
    Free,
}

impl ResearchDepth {
    /// Every preset, cheapest first.
    pub const ALL: [Self; 6] = [
        Self::Flash,
        Self::Quick,
        Self::Standard,
        Self::Deep,
        Self::DeepDive,
        Self::Free,
    ];

    /// Name as accepted on the command line.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flash => "flash",
            Self::Quick => "quick",
            Self::Standard => "standard",
            Self::Deep => "deep",
            Self::DeepDive => "deep-dive",
            Self::Free => "free",
        }
    }
}

impl fmt::Display for ResearchDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResearchDepth {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|depth| depth.as_str() == normalized)
            .ok_or_else(|| ResearchError::Validation(format!("unknown research depth '{s}'")))
    }
}

/// A research request as submitted by a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResearchRequest {
    /// Topic or question to research
    pub topic: String,

    /// Requested depth preset
    #[serde(default)]
    pub depth: ResearchDepth,

    /// Maximum projected spend in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost_usd: Option<f64>,

    /// Opaque persona reference resolved by the persona collaborator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,

    /// Explicit backend roster replacing the preset roles
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backend_overrides: Vec<BackendId>,

    /// Deadline for the dispatch stage in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

impl ResearchRequest {
    /// Request with default options.
    pub fn new(topic: impl Into<String>, depth: ResearchDepth) -> Self {
        Self {
            topic: topic.into(),
            depth,
            ..Default::default()
        }
    }

    /// Cap the projected workflow cost.
    #[must_use]
    pub const fn with_max_cost(mut self, max_cost_usd: f64) -> Self {
        self.max_cost_usd = Some(max_cost_usd);
        self
    }

    /// Pick a persona for the system prompt.
    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    /// Replace the preset roster with explicit backends.
    #[must_use]
    pub fn with_backends(mut self, backends: impl IntoIterator<Item = BackendId>) -> Self {
        self.backend_overrides = backends.into_iter().collect();
        self
    }

    /// Bound the dispatch stage.
    #[must_use]
    pub const fn with_deadline_secs(mut self, secs: u64) -> Self {
        self.deadline_secs = Some(secs);
        self
    }

    /// Reject malformed requests before anything is dispatched.
    pub fn validate(&self, catalog: &BackendCatalog) -> Result<(), ResearchError> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(ResearchError::Validation("topic cannot be empty".to_string()));
        }
        if topic.chars().count() > MAX_TOPIC_CHARS {
            return Err(ResearchError::Validation(format!(
                "topic exceeds {MAX_TOPIC_CHARS} characters"
            )));
        }

        if let Some(ceiling) = self.max_cost_usd {
            if !ceiling.is_finite() || ceiling <= 0.0 {
                return Err(ResearchError::Validation(format!(
                    "max_cost_usd must be a positive amount, got {ceiling}"
                )));
            }
        }

        if self.deadline_secs == Some(0) {
            return Err(ResearchError::Validation(
                "deadline_secs must be greater than 0".to_string(),
            ));
        }

        for (i, backend) in self.backend_overrides.iter().enumerate() {
            if !catalog.contains(backend.as_str()) {
                return Err(ResearchError::Validation(format!(
                    "unknown backend override '{backend}'"
                )));
            }
            if self.backend_overrides[..i].contains(backend) {
                return Err(ResearchError::Validation(format!(
                    "backend override '{backend}' listed twice"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_parsing() {
        assert_eq!("deep-dive".parse::<ResearchDepth>().unwrap(), ResearchDepth::DeepDive);
        assert_eq!("Deep_Dive".parse::<ResearchDepth>().unwrap(), ResearchDepth::DeepDive);
        assert_eq!(" flash ".parse::<ResearchDepth>().unwrap(), ResearchDepth::Flash);
        assert!("bottomless".parse::<ResearchDepth>().is_err());
    }

    #[test]
    fn test_depth_serde_is_kebab_case() {
        let json = serde_json::to_string(&ResearchDepth::DeepDive).unwrap();
        assert_eq!(json, "\"deep-dive\"");
    }

    #[test]
    fn test_validate_accepts_well_formed_request() {
        let request = ResearchRequest::new("Solid-state battery outlook", ResearchDepth::Standard)
            .with_max_cost(0.5)
            .with_backends(vec![BackendId::from("gpt-4o")]);
        assert!(request.validate(&BackendCatalog::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_topic() {
        let request = ResearchRequest::new("   ", ResearchDepth::Flash);
        let err = request.validate(&BackendCatalog::default()).unwrap_err();
        assert!(matches!(err, ResearchError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_non_positive_ceiling() {
        let catalog = BackendCatalog::default();
        let zero = ResearchRequest::new("topic", ResearchDepth::Flash).with_max_cost(0.0);
        assert!(zero.validate(&catalog).is_err());
        let nan = ResearchRequest::new("topic", ResearchDepth::Flash).with_max_cost(f64::NAN);
        assert!(nan.validate(&catalog).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_and_duplicate_overrides() {
        let catalog = BackendCatalog::default();
        let unknown = ResearchRequest::new("topic", ResearchDepth::Flash)
            .with_backends(vec![BackendId::from("hal-9000")]);
        assert!(unknown.validate(&catalog).is_err());

        let duplicate = ResearchRequest::new("topic", ResearchDepth::Flash)
            .with_backends(vec![BackendId::from("gpt-4o"), BackendId::from("gpt-4o")]);
        assert!(duplicate.validate(&catalog).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_deadline() {
        let request = ResearchRequest::new("topic", ResearchDepth::Flash).with_deadline_secs(0);
        assert!(request.validate(&BackendCatalog::default()).is_err());
    }
}
