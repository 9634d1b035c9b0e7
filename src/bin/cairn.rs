//! Cairn CLI Binary
//!
//! Command-line interface for the content-addressed archive.

use cairn::error::ApiError;
use cairn::logging::init_logging;
use cairn::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = setup_logging(&cli, &context) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// CLI flags override the layered logging config
fn setup_logging(cli: &Cli, context: &CliContext) -> Result<(), ApiError> {
    let mut logging = context.config().logging.clone();
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    logging.apply_verbosity(cli.verbose);
    if let Some(format) = &cli.log_format {
        logging.format = format.parse()?;
    }
    if let Some(output) = &cli.log_output {
        logging.output = output.parse()?;
    }
    if cli.log_file.is_some() {
        logging.file = cli.log_file.clone();
    }
    init_logging(&logging)
}
