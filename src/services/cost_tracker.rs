//! Cost projection and per-request spend tracking.
//!
//! Projection prices a fixed assumed token volume against the catalog so the
//! workflow selector can compare candidates before any call is made. Actual
//! spend is summed from the validated responses after dispatch.

use crate::domain::models::{BackendProfile, CostBreakdown, ModelResponse, ProjectionConfig};

/// Projected cost in USD of one call to a backend at the assumed token volume.
pub fn projected_cost(profile: &BackendProfile, projection: &ProjectionConfig) -> f64 {
    profile.cost_for(projection.assumed_input_tokens, projection.assumed_output_tokens)
}

/// Accumulates actual spend across the responses of one request.
#[derive(Debug, Clone, Default)]
pub struct CostTracker {
    breakdown: CostBreakdown,
    call_count: u32,
}

impl CostTracker {
    /// Tracker with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one response's tokens and cost.
    pub fn record(&mut self, response: &ModelResponse) {
        self.breakdown.input_tokens += u64::from(response.input_tokens);
        self.breakdown.output_tokens += u64::from(response.output_tokens);
        self.breakdown.total_usd += response.cost_usd;
        *self
            .breakdown
            .by_backend
            .entry(response.backend.clone())
            .or_default() += response.cost_usd;
        self.call_count += 1;
    }

    /// Responses recorded so far.
    pub const fn call_count(&self) -> u32 {
        self.call_count
    }

    /// Consume the tracker into the final breakdown.
    pub fn finish(self) -> CostBreakdown {
        self.breakdown
    }

    /// Summarize a full response set.
    pub fn summarize<'a>(responses: impl IntoIterator<Item = &'a ModelResponse>) -> CostBreakdown {
        let mut tracker = Self::new();
        for response in responses {
            tracker.record(response);
        }
        tracker.finish()
    }
}

/// Format a breakdown as a human-readable summary.
pub fn format_summary(breakdown: &CostBreakdown) -> String {
    let mut s = format!(
        "Cost: ${:.4} ({}K input, {}K output)",
        breakdown.total_usd,
        breakdown.input_tokens / 1000,
        breakdown.output_tokens / 1000,
    );

    if breakdown.by_backend.len() > 1 {
        s.push_str("\n  By backend:");
        let mut backends: Vec<_> = breakdown.by_backend.iter().collect();
        backends.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (backend, cost) in backends {
            s.push_str(&format!("\n    {backend}: ${cost:.4}"));
        }
    }

    s
}
