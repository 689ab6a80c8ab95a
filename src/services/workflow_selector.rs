//! Workflow selection: depth preset + cost ceiling + availability -> plan.
//!
//! Each preset is a static list of roles, each role a ranked list of candidate
//! backends. Selection never fails while at least one backend is reachable:
//! unavailable candidates are skipped, an over-budget role falls back to its
//! cheapest candidate, and an empty roster falls back to the primary backend.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::cost_tracker::projected_cost;
use crate::domain::errors::{DomainResult, ResearchError};
use crate::domain::models::{
    BackendCatalog, BackendId, DispatchStrategy, ProjectionConfig, ResearchDepth, ResearchRequest,
    RosterEntry, WorkflowPlan,
};

/// A named roster slot with its ranked candidates.
#[derive(Debug, Clone)]
struct Role {
    name: String,
    candidates: Vec<BackendId>,
}

impl Role {
    fn new(name: &str, candidates: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            candidates: candidates.iter().copied().map(BackendId::from).collect(),
        }
    }
}

/// Static shape of a depth preset.
#[derive(Debug, Clone)]
struct Preset {
    roles: Vec<Role>,
    synthesizer: Option<Role>,
    tie_breaker: Vec<BackendId>,
    sequential: bool,
}

fn preset(depth: ResearchDepth) -> Preset {
    let (roles, synthesizer, tie_breaker, sequential): (Vec<Role>, Option<Role>, &[&str], bool) =
        match depth {
            ResearchDepth::Flash => (
                vec![Role::new("fast", &["gemini-flash", "gpt-mini", "claude-haiku"])],
                None,
                &[],
                false,
            ),
            ResearchDepth::Quick => (
                vec![
                    Role::new("fast", &["gemini-flash", "gpt-mini"]),
                    Role::new("cross-check", &["claude-haiku", "gpt-mini", "mistral-small"]),
                ],
                None,
                &[],
                false,
            ),
            ResearchDepth::Standard => (
                vec![
                    Role::new("reasoner", &["claude-sonnet", "gpt-4o", "gemini-pro"]),
                    Role::new("generalist", &["gpt-4o", "gemini-pro", "deepseek"]),
                    Role::new("fast", &["gemini-flash", "gpt-mini"]),
                ],
                None,
                &[],
                false,
            ),
            ResearchDepth::Deep => (
                vec![
                    Role::new("reasoner", &["claude-sonnet", "gpt-4o"]),
                    Role::new("generalist", &["gpt-4o", "gemini-pro"]),
                    Role::new("analyst", &["gemini-pro", "deepseek"]),
                    Role::new("contrarian", &["deepseek", "llama-groq", "mistral-small"]),
                ],
                None,
                &["mistral-small", "gpt-mini"],
                false,
            ),
            ResearchDepth::DeepDive => (
                vec![
                    Role::new("reasoner", &["claude-sonnet", "gpt-4o"]),
                    Role::new("generalist", &["gpt-4o", "gemini-pro"]),
                    Role::new("analyst", &["gemini-pro", "deepseek"]),
                    Role::new("contrarian", &["deepseek", "mistral-small"]),
                    Role::new("wildcard", &["llama-groq", "mistral-small", "gpt-mini"]),
                ],
                Some(Role::new("synthesizer", &["claude-opus", "claude-sonnet", "gpt-4o"])),
                &[],
                false,
            ),
            ResearchDepth::Free => (
                vec![
                    Role::new("primary", &["gemini-flash"]),
                    Role::new("secondary", &["llama-groq"]),
                    Role::new("tertiary", &["mistral-small"]),
                ],
                None,
                &[],
                true,
            ),
        };

    Preset {
        roles,
        synthesizer,
        tie_breaker: tie_breaker.iter().copied().map(BackendId::from).collect(),
        sequential,
    }
}

/// Running state while filling roles.
struct Selection<'a> {
    available: &'a BTreeSet<BackendId>,
    ceiling: Option<f64>,
    roster: Vec<RosterEntry>,
    cumulative: f64,
    degraded: bool,
}

impl Selection<'_> {
    fn is_used(&self, backend: &BackendId) -> bool {
        self.roster.iter().any(|entry| &entry.backend == backend)
    }
}

/// Resolves research requests into concrete workflow plans.
#[derive(Debug, Clone)]
pub struct WorkflowSelector {
    catalog: BackendCatalog,
    projection: ProjectionConfig,
    sequential_delay_ms: u64,
}

impl WorkflowSelector {
    /// Selector over `catalog`, projecting cost with `projection`.
    pub const fn new(catalog: BackendCatalog, projection: ProjectionConfig, sequential_delay_ms: u64) -> Self {
        Self {
            catalog,
            projection,
            sequential_delay_ms,
        }
    }

    /// Catalog plans are resolved against.
    pub const fn catalog(&self) -> &BackendCatalog {
        &self.catalog
    }

    /// Resolve a request against the set of currently reachable backends.
    ///
    /// # Errors
    /// `NoProviders` when nothing in the catalog is reachable.
    pub fn select(
        &self,
        request: &ResearchRequest,
        available: &BTreeSet<BackendId>,
    ) -> DomainResult<WorkflowPlan> {
        let reachable: BTreeSet<BackendId> = available
            .iter()
            .filter(|id| self.catalog.contains(id.as_str()))
            .cloned()
            .collect();
        if reachable.is_empty() {
            return Err(ResearchError::NoProviders {
                topic: request.topic.clone(),
            });
        }

        let mut preset = preset(request.depth);
        if !request.backend_overrides.is_empty() {
            preset.roles = request
                .backend_overrides
                .iter()
                .enumerate()
                .map(|(idx, id)| Role {
                    name: format!("override-{}", idx + 1),
                    candidates: vec![id.clone()],
                })
                .collect();
            preset.synthesizer = None;
        }

        let mut selection = Selection {
            available: &reachable,
            ceiling: request.max_cost_usd,
            roster: Vec::new(),
            cumulative: 0.0,
            degraded: false,
        };

        for role in &preset.roles {
            if let Some(entry) = self.fill_role(role, &mut selection) {
                selection.roster.push(entry);
            }
        }

        let synthesizer = if selection.roster.is_empty() {
            None
        } else {
            preset
                .synthesizer
                .as_ref()
                .and_then(|role| self.fill_role(role, &mut selection))
        };

        if selection.roster.is_empty() {
            let fallback = self.fallback_entry(&reachable);
            warn!(
                depth = %request.depth,
                backend = %fallback.backend,
                "no preset role could be filled, falling back to a single backend"
            );
            selection.cumulative += fallback.projected_cost_usd;
            selection.roster.push(fallback);
            selection.degraded = true;
        }

        let tie_breaker = self.pick_tie_breaker(&preset.tie_breaker, &selection, synthesizer.as_ref());
        if let Some(entry) = &tie_breaker {
            selection.cumulative += entry.projected_cost_usd;
        }

        let pass_count = if synthesizer.is_some() { 2 } else { 1 };
        let mut roster = selection.roster;
        roster.extend(synthesizer);

        let strategy = if preset.sequential {
            DispatchStrategy::SequentialThrottled {
                delay_ms: self.sequential_delay_ms,
            }
        } else {
            DispatchStrategy::Concurrent
        };

        let plan = WorkflowPlan {
            depth: request.depth,
            validate_outliers: roster.len() > 1,
            roster,
            pass_count,
            tie_breaker,
            strategy,
            projected_cost_usd: selection.cumulative,
            degraded: selection.degraded,
        };

        info!(
            depth = %plan.depth,
            roster = plan.roster.len(),
            pass_count = plan.pass_count,
            projected_cost_usd = plan.projected_cost_usd,
            degraded = plan.degraded,
            "workflow selected"
        );
        Ok(plan)
    }

    /// Pick a backend for one role, honoring availability and the ceiling.
    fn fill_role(&self, role: &Role, selection: &mut Selection<'_>) -> Option<RosterEntry> {
        let usable: Vec<RosterEntry> = role
            .candidates
            .iter()
            .filter(|id| selection.available.contains(*id) && !selection.is_used(id))
            .filter_map(|id| self.entry(id, &role.name))
            .collect();

        if usable.is_empty() {
            debug!(role = %role.name, "no reachable candidate, dropping role");
            selection.degraded = true;
            return None;
        }

        let chosen = match selection.ceiling {
            None => usable.into_iter().next(),
            Some(ceiling) => {
                let cumulative = selection.cumulative;
                let within = usable
                    .iter()
                    .position(|entry| cumulative + entry.projected_cost_usd <= ceiling);
                match within {
                    Some(idx) => usable.into_iter().nth(idx),
                    None => {
                        let cheapest = usable
                            .into_iter()
                            .min_by(|a, b| a.projected_cost_usd.total_cmp(&b.projected_cost_usd));
                        if let Some(entry) = &cheapest {
                            warn!(
                                role = %role.name,
                                backend = %entry.backend,
                                ceiling,
                                "no candidate fits the cost ceiling, forcing the cheapest"
                            );
                        }
                        selection.degraded = true;
                        cheapest
                    }
                }
            }
        };

        if let Some(entry) = &chosen {
            selection.cumulative += entry.projected_cost_usd;
        }
        chosen
    }

    fn pick_tie_breaker(
        &self,
        candidates: &[BackendId],
        selection: &Selection<'_>,
        synthesizer: Option<&RosterEntry>,
    ) -> Option<RosterEntry> {
        candidates
            .iter()
            .filter(|id| selection.available.contains(*id) && !selection.is_used(id))
            .filter(|id| synthesizer.map_or(true, |entry| &entry.backend != *id))
            .filter_map(|id| self.entry(id, "tie-breaker"))
            .find(|entry| {
                selection
                    .ceiling
                    .map_or(true, |ceiling| selection.cumulative + entry.projected_cost_usd <= ceiling)
            })
    }

    /// Primary backend if reachable, else the first reachable id.
    fn fallback_entry(&self, reachable: &BTreeSet<BackendId>) -> RosterEntry {
        let backend = if reachable.contains(&self.catalog.primary) {
            self.catalog.primary.clone()
        } else {
            reachable
                .iter()
                .next()
                .cloned()
                .unwrap_or_else(|| self.catalog.primary.clone())
        };
        self.entry(&backend, "fallback").unwrap_or_else(|| RosterEntry {
            model_id: backend.to_string(),
            backend,
            role: "fallback".to_string(),
            projected_cost_usd: 0.0,
        })
    }

    fn entry(&self, backend: &BackendId, role: &str) -> Option<RosterEntry> {
        self.catalog.get(backend.as_str()).map(|profile| RosterEntry {
            backend: backend.clone(),
            model_id: profile.default_model.clone(),
            role: role.to_string(),
            projected_cost_usd: projected_cost(profile, &self.projection),
        })
    }
}
