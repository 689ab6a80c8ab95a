//! Storage port for completed research results.
//!
//! The orchestrator hands results off without awaiting completion; a sink
//! failure is logged and never surfaces to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::models::ResearchResult;

/// Destination for completed results.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist a completed result, with an optional topic embedding.
    async fn store(&self, result: &ResearchResult, embedding: Option<Vec<f32>>) -> anyhow::Result<()>;
}

/// A sink that discards everything.
#[derive(Debug, Clone, Default)]
pub struct NullResultSink;

impl NullResultSink {
    /// Discarding sink.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResultSink for NullResultSink {
    async fn store(&self, _result: &ResearchResult, _embedding: Option<Vec<f32>>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Keeps results in memory. Useful for tests and short-lived sessions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResultSink {
    results: Arc<RwLock<Vec<ResearchResult>>>,
}

impl InMemoryResultSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored so far.
    pub async fn results(&self) -> Vec<ResearchResult> {
        self.results.read().await.clone()
    }
}

#[async_trait]
impl ResultSink for InMemoryResultSink {
    async fn store(&self, result: &ResearchResult, _embedding: Option<Vec<f32>>) -> anyhow::Result<()> {
        self.results.write().await.push(result.clone());
        Ok(())
    }
}
