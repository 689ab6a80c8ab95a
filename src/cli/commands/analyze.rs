//! `conclave analyze`: run the analysis half over saved responses.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::application::ResearchOrchestrator;
use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::domain::models::{Config, ModelResponse, ResearchDepth, ResearchResult};
use crate::infrastructure::providers::ProviderRegistry;
use crate::services::format_summary;

const CLAIM_COLUMN_CHARS: usize = 80;

/// Arguments of `conclave analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// JSON file holding an array of model responses
    pub file: PathBuf,

    /// Topic the responses answer (defaults to the file name)
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Depth recorded on the result
    #[arg(short, long, default_value = "standard")]
    pub depth: String,
}

/// Rendered analysis result.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct AnalyzeOutput {
    /// The assembled result
    pub result: ResearchResult,
}

impl CommandOutput for AnalyzeOutput {
    fn to_human(&self) -> String {
        let result = &self.result;
        let mut lines = vec![
            format!("Topic: {}", result.topic),
            format!(
                "Confidence: {}/100 (variance: {})",
                result.confidence_score,
                result.variance.severity.as_str()
            ),
            String::new(),
            result.summary.clone(),
        ];

        if !result.confirmed.is_empty() {
            let mut confirmed = table(["Confirmed claim", "Agreement", "Backends"]);
            for finding in &result.confirmed {
                confirmed.add_row(vec![
                    truncate(&finding.claim, CLAIM_COLUMN_CHARS),
                    format!("{:.0}%", finding.confidence * 100.0),
                    finding
                        .backends
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                ]);
            }
            lines.push(String::new());
            lines.push(confirmed.to_string());
        }

        if !result.outliers.outliers.is_empty() {
            let mut outliers = table(["Outlier", "Category", "Reasoning"]);
            for outlier in &result.outliers.outliers {
                outliers.add_row(vec![
                    outlier.backend.to_string(),
                    outlier.category.as_str().to_string(),
                    outlier.reasoning.clone(),
                ]);
            }
            lines.push(String::new());
            lines.push(outliers.to_string());
        }

        if !result.derivatives.is_empty() {
            lines.push(String::new());
            lines.push("Insights:".to_string());
            for derivative in &result.derivatives {
                lines.push(format!("  - {}", derivative.message));
            }
        }

        lines.push(String::new());
        lines.push(format_summary(&result.cost));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Analyze the responses saved in `args.file`.
pub fn execute(args: AnalyzeArgs, config: &Config, json_mode: bool) -> Result<()> {
    let depth: ResearchDepth = args.depth.parse()?;
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let responses: Vec<ModelResponse> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of responses", args.file.display()))?;

    let topic = args.topic.unwrap_or_else(|| {
        args.file
            .file_stem()
            .map_or_else(|| "untitled".to_string(), |stem| stem.to_string_lossy().into_owned())
    });

    let registry = Arc::new(ProviderRegistry::new(config.catalog.clone()));
    let orchestrator = ResearchOrchestrator::new(config, registry);
    let result = orchestrator
        .analyze(&topic, depth, responses)
        .context("Analysis failed")?;

    output(&AnalyzeOutput { result }, json_mode);
    Ok(())
}
