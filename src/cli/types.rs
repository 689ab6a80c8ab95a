//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::analyze::AnalyzeArgs;
use super::commands::plan::PlanArgs;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "conclave")]
#[command(about = "Conclave - multi-model research and consensus engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .conclave/
    #[arg(short, long, global = true, env = "CONCLAVE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the workflow a request would run, without calling any backend
    Plan(PlanArgs),

    /// Run consensus, variance and outlier analysis over saved responses
    Analyze(AnalyzeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan_with_overrides() {
        let cli = Cli::try_parse_from([
            "conclave", "--json", "plan", "--depth", "deep", "--max-cost", "0.05", "--backend",
            "gpt-4o", "--backend", "gemini-flash",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.depth, "deep");
                assert_eq!(args.max_cost, Some(0.05));
                assert_eq!(args.backend, vec!["gpt-4o", "gemini-flash"]);
            }
            Commands::Analyze(_) => panic!("expected plan"),
        }
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from(["conclave", "analyze", "responses.json", "--topic", "Rates"])
            .unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.file, PathBuf::from("responses.json"));
                assert_eq!(args.topic.as_deref(), Some("Rates"));
            }
            Commands::Plan(_) => panic!("expected analyze"),
        }
    }
}
