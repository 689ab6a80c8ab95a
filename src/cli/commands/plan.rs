//! `conclave plan`: resolve a workflow against the configured catalog.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, table, usd, CommandOutput};
use crate::domain::models::{BackendId, Config, DispatchStrategy, ResearchDepth, ResearchRequest, WorkflowPlan};
use crate::services::WorkflowSelector;

const PREVIEW_TOPIC: &str = "workflow preview";

/// Arguments of `conclave plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Research depth (flash, quick, standard, deep, deep-dive, free)
    #[arg(short, long, default_value = "standard")]
    pub depth: String,

    /// Maximum projected spend in USD
    #[arg(short, long)]
    pub max_cost: Option<f64>,

    /// Explicit backend roster (repeatable); replaces the preset roles
    #[arg(short, long)]
    pub backend: Vec<String>,
}

/// Rendered workflow plan.
#[derive(Debug, Serialize)]
pub struct PlanOutput {
    /// The resolved plan
    pub plan: WorkflowPlan,
}

impl CommandOutput for PlanOutput {
    fn to_human(&self) -> String {
        let plan = &self.plan;
        let mut roster = table(["Role", "Backend", "Model", "Projected"]);
        for entry in &plan.roster {
            roster.add_row(vec![
                entry.role.clone(),
                entry.backend.to_string(),
                entry.model_id.clone(),
                usd(entry.projected_cost_usd),
            ]);
        }
        if let Some(tie_breaker) = &plan.tie_breaker {
            roster.add_row(vec![
                "tie-breaker".to_string(),
                tie_breaker.backend.to_string(),
                tie_breaker.model_id.clone(),
                usd(tie_breaker.projected_cost_usd),
            ]);
        }

        let strategy = match plan.strategy {
            DispatchStrategy::Concurrent => "concurrent".to_string(),
            DispatchStrategy::SequentialThrottled { delay_ms } => {
                format!("sequential ({delay_ms}ms between calls)")
            }
        };

        let mut lines = vec![
            format!("Workflow: {}", plan.depth),
            roster.to_string(),
            format!("Passes: {}", plan.pass_count),
            format!("Dispatch: {strategy}"),
            format!("Outlier validation: {}", if plan.validate_outliers { "on" } else { "off" }),
            format!("Projected cost: {}", usd(plan.projected_cost_usd)),
        ];
        if plan.degraded {
            lines.push("Note: availability or the cost ceiling forced fallback picks.".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Resolve and print the workflow for `args`.
pub fn execute(args: PlanArgs, config: &Config, json_mode: bool) -> Result<()> {
    let depth: ResearchDepth = args.depth.parse()?;
    let mut request = ResearchRequest::new(PREVIEW_TOPIC, depth)
        .with_backends(args.backend.into_iter().map(BackendId::from));
    request.max_cost_usd = args.max_cost;
    request.validate(&config.catalog)?;

    let selector = WorkflowSelector::new(
        config.catalog.clone(),
        config.projection.clone(),
        config.dispatch.sequential_delay_ms,
    );
    let reachable: BTreeSet<BackendId> = config.catalog.ids().cloned().collect();
    let plan = selector
        .select(&request, &reachable)
        .with_context(|| format!("Failed to resolve a {depth} workflow"))?;

    output(&PlanOutput { plan }, json_mode);
    Ok(())
}
