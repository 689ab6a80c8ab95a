//! Resolved workflow plans.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::backend::BackendId;
use super::request::ResearchDepth;

/// How pass-1 calls are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DispatchStrategy {
    /// Every roster call in flight at once
    Concurrent,
    /// One call at a time with a fixed pause between calls
    SequentialThrottled {
        /// Pause between consecutive calls
        delay_ms: u64,
    },
}

impl DispatchStrategy {
    /// Pause between pass-1 calls, if any.
    pub const fn delay(&self) -> Option<Duration> {
        match self {
            Self::Concurrent => None,
            Self::SequentialThrottled { delay_ms } => Some(Duration::from_millis(*delay_ms)),
        }
    }
}

/// One backend slot in a resolved roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RosterEntry {
    /// Assigned backend
    pub backend: BackendId,
    /// Model to request
    pub model_id: String,
    /// Role name from the preset (e.g. `reasoner`, `synthesizer`)
    pub role: String,
    /// Estimated cost of the call
    pub projected_cost_usd: f64,
}

/// Concrete plan for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkflowPlan {
    /// Depth the plan was resolved for
    pub depth: ResearchDepth,
    /// Ordered roster; with two passes the last entry is the synthesizer
    pub roster: Vec<RosterEntry>,
    /// 1, or 2 when a synthesis pass follows
    pub pass_count: u8,
    /// Whether outlier isolation runs
    pub validate_outliers: bool,
    /// Backend reserved for breaking an even response count
    pub tie_breaker: Option<RosterEntry>,
    /// Pass-1 dispatch strategy
    pub strategy: DispatchStrategy,
    /// Estimated cost of the whole roster
    pub projected_cost_usd: f64,
    /// Set when availability or the cost ceiling forced a fallback pick
    pub degraded: bool,
}

impl WorkflowPlan {
    /// Entries dispatched in pass 1 (the roster minus any synthesizer).
    pub fn pass_one(&self) -> &[RosterEntry] {
        if self.pass_count == 2 && !self.roster.is_empty() {
            &self.roster[..self.roster.len() - 1]
        } else {
            &self.roster
        }
    }

    /// Pass-2 synthesizer, when the plan has two passes.
    pub fn synthesizer(&self) -> Option<&RosterEntry> {
        if self.pass_count == 2 {
            self.roster.last()
        } else {
            None
        }
    }

    /// Whether a backend already holds a slot (roster or tie-breaker).
    pub fn uses(&self, backend: &BackendId) -> bool {
        self.roster.iter().any(|entry| &entry.backend == backend)
            || self.tie_breaker.as_ref().is_some_and(|entry| &entry.backend == backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, role: &str) -> RosterEntry {
        RosterEntry {
            backend: BackendId::from(id),
            model_id: format!("{id}-model"),
            role: role.to_string(),
            projected_cost_usd: 0.01,
        }
    }

    #[test]
    fn test_two_pass_plan_splits_synthesizer() {
        let plan = WorkflowPlan {
            depth: ResearchDepth::DeepDive,
            roster: vec![entry("a", "r1"), entry("b", "r2"), entry("c", "synthesizer")],
            pass_count: 2,
            validate_outliers: true,
            tie_breaker: None,
            strategy: DispatchStrategy::Concurrent,
            projected_cost_usd: 0.03,
            degraded: false,
        };

        assert_eq!(plan.pass_one().len(), 2);
        assert_eq!(plan.synthesizer().map(|e| e.backend.as_str()), Some("c"));
        assert!(plan.uses(&BackendId::from("c")));
        assert!(!plan.uses(&BackendId::from("d")));
    }

    #[test]
    fn test_single_pass_plan_has_no_synthesizer() {
        let plan = WorkflowPlan {
            depth: ResearchDepth::Flash,
            roster: vec![entry("a", "fast")],
            pass_count: 1,
            validate_outliers: false,
            tie_breaker: None,
            strategy: DispatchStrategy::SequentialThrottled { delay_ms: 250 },
            projected_cost_usd: 0.01,
            degraded: false,
        };

        assert_eq!(plan.pass_one().len(), 1);
        assert!(plan.synthesizer().is_none());
        assert_eq!(plan.strategy.delay(), Some(Duration::from_millis(250)));
    }
}
