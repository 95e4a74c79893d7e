//! Arbor CLI Binary
//!
//! Command-line interface for archive categories and the organigram.

use arbor::logging::init_logging;
use arbor::tooling::cli::{load_config, Cli, CliContext};
use clap::Parser;
use std::process;

fn run(cli: Cli) -> anyhow::Result<String> {
    let mut config = load_config(&cli.workspace, cli.config.as_ref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(output) = &cli.log_output {
        config.logging.output = output.clone();
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.clone());
    }
    init_logging(Some(&config.logging))?;

    let context = CliContext::with_config(&cli.workspace, config, cli.principal.clone(), &cli.format)?;
    Ok(context.execute(&cli.command)?)
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
