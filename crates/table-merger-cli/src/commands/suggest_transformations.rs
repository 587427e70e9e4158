//! Suggest-transformations command - ask the model for value transformations.

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::{LlmArgs, TableArgs};

pub fn run(
    tables: TableArgs,
    mapping: PathBuf,
    llm: LlmArgs,
    output: Option<PathBuf>,
    allow_reuse: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let confirmed = super::load_mapping(&mapping)?;

    let manager = super::build_manager(&tables, &llm)?;
    let mut op = super::prepare(&manager, &tables)?.with_incoming_reuse(allow_reuse);
    op.confirm_mapping(confirmed)?;

    eprintln!(
        "{} for {} columns ({})",
        "Suggesting transformations".cyan().bold(),
        op.template_column_info().len().to_string().white().bold(),
        llm.llm
    );

    let suggestion = op.suggest_transformations(&manager.transformation_suggester())?;
    for t in &suggestion.transformations {
        eprintln!("  {:20} = {}", t.column_name, t.transformation_expression);
    }

    super::write_json(suggestion, output.as_deref())?;

    if let Some(path) = &output {
        eprintln!(
            "{} {}; edit it, then run {}",
            "Saved to".green().bold(),
            path.display().to_string().white(),
            "table-merger apply".cyan().bold()
        );
    }

    Ok(())
}
