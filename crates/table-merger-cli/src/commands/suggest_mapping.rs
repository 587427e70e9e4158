//! Suggest-mapping command - ask the model for a column mapping.

use std::path::PathBuf;

use colored::Colorize;
use table_merger::Confidence;

use crate::cli::{LlmArgs, TableArgs};

pub fn run(
    tables: TableArgs,
    llm: LlmArgs,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!(
        "{} {} {} {} ({})",
        "Mapping".cyan().bold(),
        tables.incoming.display().to_string().white(),
        "onto".dimmed(),
        tables.template.display().to_string().white(),
        llm.llm
    );

    let manager = super::build_manager(&tables, &llm)?;
    let mut op = super::prepare(&manager, &tables)?;
    let suggestion = op.suggest_mapping(&manager.mapping_suggester())?;

    for mapping in &suggestion.column_mapping {
        let confidence = match mapping.confidence {
            Confidence::High => mapping.confidence.label().green(),
            Confidence::Medium => mapping.confidence.label().yellow(),
            Confidence::Low => mapping.confidence.label().red(),
        };
        eprintln!(
            "  {:20} <- {:20} {}",
            mapping.template_column, mapping.incoming_column, confidence
        );
        if mapping.is_ambiguous() {
            eprintln!(
                "  {:20}    {} {}",
                "",
                "also plausible:".dimmed(),
                mapping.candidates().join(", ")
            );
        }
    }
    for error in &suggestion.errors {
        eprintln!("  {} {}", "warning:".yellow().bold(), error);
    }

    super::write_json(suggestion, output.as_deref())?;

    if let Some(path) = &output {
        eprintln!(
            "{} {}; edit it, then run {}",
            "Saved to".green().bold(),
            path.display().to_string().white(),
            "table-merger suggest-transformations".cyan().bold()
        );
    }

    Ok(())
}
