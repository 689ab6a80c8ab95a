//! Persona port.
//!
//! Supplies an opaque system prompt by identifier. The pipeline never
//! interprets the content.

use std::collections::HashMap;

/// Lookup of system prompts by persona identifier.
pub trait PersonaSource: Send + Sync {
    fn system_prompt(&self, persona_id: &str) -> Option<String>;
}

/// In-memory persona table.
#[derive(Debug, Clone, Default)]
pub struct StaticPersonaSource {
    prompts: HashMap<String, String>,
}

impl StaticPersonaSource {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persona, replacing any previous prompt with the same id.
    #[must_use]
    pub fn with_persona(mut self, persona_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        self.prompts.insert(persona_id.into(), prompt.into());
        self
    }
}

impl PersonaSource for StaticPersonaSource {
    fn system_prompt(&self, persona_id: &str) -> Option<String> {
        self.prompts.get(persona_id).cloned()
    }
}
