//! Conclave CLI entry point.

use anyhow::Result;
use clap::Parser;

use conclave::cli::{commands, Cli, Commands};
use conclave::infrastructure::config::ConfigLoader;
use conclave::infrastructure::logging::LoggerImpl;

fn main() {
    let Cli {
        command,
        json,
        config,
    } = Cli::parse();

    if let Err(err) = run(command, config.as_deref(), json) {
        conclave::cli::handle_error(err, json);
    }
}

fn run(command: Commands, config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&config.logging)?;

    match command {
        Commands::Plan(args) => commands::plan::execute(args, &config, json),
        Commands::Analyze(args) => commands::analyze::execute(args, &config, json),
    }
}
