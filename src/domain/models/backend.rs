//! Backend identities and the configured backend catalog.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a text-generation backend (e.g. `claude-sonnet`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    /// Wrap an id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BackendId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for BackendId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Static description of a backend: canonical model, pricing and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendProfile {
    /// Backend identifier
    pub id: BackendId,

    /// Canonical default model used when this backend is selected or substituted
    pub default_model: String,

    /// Cost per million input tokens (USD)
    pub input_cost_per_mtok: f64,

    /// Cost per million output tokens (USD)
    pub output_cost_per_mtok: f64,

    /// Maximum concurrent in-flight calls
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Requests admitted per refill interval
    #[serde(default = "default_requests_per_interval")]
    pub requests_per_interval: u32,

    /// Refill interval in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Whether the backend runs on a low per-minute free-tier quota
    #[serde(default)]
    pub free_tier: bool,
}

const fn default_max_concurrent() -> usize {
    4
}

const fn default_requests_per_interval() -> u32 {
    60
}

const fn default_interval_secs() -> u64 {
    60
}

impl BackendProfile {
    /// Cost in USD for the given token counts at this backend's pricing.
    pub fn cost_for(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * self.input_cost_per_mtok
            + output_tokens as f64 * self.output_cost_per_mtok)
            / 1_000_000.0
    }

    fn builtin(
        id: &str,
        default_model: &str,
        input_cost_per_mtok: f64,
        output_cost_per_mtok: f64,
        requests_per_interval: u32,
        free_tier: bool,
    ) -> Self {
        Self {
            id: BackendId::from(id),
            default_model: default_model.to_string(),
            input_cost_per_mtok,
            output_cost_per_mtok,
            max_concurrent: default_max_concurrent(),
            requests_per_interval,
            interval_secs: default_interval_secs(),
            free_tier,
        }
    }
}

/// Catalog of known backends, injected into the selector and dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendCatalog {
    /// Backend forced into the roster when nothing else is reachable
    #[serde(default = "default_primary")]
    pub primary: BackendId,

    /// Known backends
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendProfile>,
}

fn default_primary() -> BackendId {
    BackendId::from("gemini-flash")
}

fn default_backends() -> Vec<BackendProfile> {
    vec![
        BackendProfile::builtin("gemini-flash", "gemini-2.0-flash", 0.10, 0.40, 15, true),
        BackendProfile::builtin("gpt-mini", "gpt-4o-mini", 0.15, 0.60, 60, false),
        BackendProfile::builtin("claude-haiku", "claude-3-5-haiku-latest", 0.80, 4.0, 50, false),
        BackendProfile::builtin("mistral-small", "mistral-small-latest", 0.20, 0.60, 30, true),
        BackendProfile::builtin("llama-groq", "llama-3.3-70b-versatile", 0.59, 0.79, 30, true),
        BackendProfile::builtin("deepseek", "deepseek-chat", 0.27, 1.10, 60, false),
        BackendProfile::builtin("gemini-pro", "gemini-1.5-pro", 1.25, 5.0, 60, false),
        BackendProfile::builtin("gpt-4o", "gpt-4o", 2.50, 10.0, 60, false),
        BackendProfile::builtin("claude-sonnet", "claude-sonnet-4-5", 3.0, 15.0, 50, false),
        BackendProfile::builtin("claude-opus", "claude-opus-4-1", 15.0, 75.0, 50, false),
    ]
}

impl Default for BackendCatalog {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            backends: default_backends(),
        }
    }
}

impl BackendCatalog {
    /// Profile by id.
    pub fn get(&self, id: &str) -> Option<&BackendProfile> {
        self.backends.iter().find(|profile| profile.id.as_str() == id)
    }

    /// Whether the catalog knows `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Canonical model for a backend, if known.
    pub fn default_model(&self, id: &str) -> Option<&str> {
        self.get(id).map(|profile| profile.default_model.as_str())
    }

    /// Every configured backend id, in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = &BackendId> {
        self.backends.iter().map(|profile| &profile.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_contains_primary() {
        let catalog = BackendCatalog::default();
        assert!(catalog.contains(catalog.primary.as_str()));
        assert_eq!(catalog.default_model("gpt-4o"), Some("gpt-4o"));
        assert!(catalog.get("unknown").is_none());
    }

    #[test]
    fn test_cost_for_uses_per_million_pricing() {
        let catalog = BackendCatalog::default();
        let sonnet = catalog.get("claude-sonnet").unwrap();
        // 1M input at $3 + 1M output at $15
        assert!((sonnet.cost_for(1_000_000, 1_000_000) - 18.0).abs() < 1e-9);
        assert!(sonnet.cost_for(0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_backend_id_serializes_transparently() {
        let id = BackendId::from("deepseek");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"deepseek\"");
        let parsed: BackendId = serde_json::from_str("\"deepseek\"").unwrap();
        assert_eq!(parsed, id);
    }
}
