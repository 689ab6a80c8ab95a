//! Grounding port.
//!
//! Optional collaborator that decides whether a topic needs external context
//! and, if so, returns a pre-formatted block prepended to every prompt.

use async_trait::async_trait;

/// Supplies optional context for a research topic.
#[async_trait]
pub trait GroundingSource: Send + Sync {
    /// Context block for the topic, or `None` when no grounding applies.
    async fn context_for(&self, topic: &str) -> Option<String>;
}
