//! Table Merger CLI - file-based review of LLM merge suggestions.
//!
//! Each suggestion step writes JSON that a human edits before running the
//! next step.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Profile { file, examples } => commands::profile::run(file, examples),

        Commands::SuggestMapping {
            tables,
            provider,
            output,
        } => commands::suggest_mapping::run(tables, provider, output),

        Commands::SuggestTransformations {
            tables,
            mapping,
            provider,
            output,
            allow_reuse,
        } => commands::suggest_transformations::run(tables, mapping, provider, output, allow_reuse),

        Commands::Apply {
            tables,
            mapping,
            transformations,
            output,
            allow_reuse,
        } => commands::apply::run(tables, mapping, transformations, output, allow_reuse),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins unless `--verbose` is given.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("table_merger=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("table_merger=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
