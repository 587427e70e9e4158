//! Apply command - write the merged table as CSV.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use table_merger::{ColumnInfo, ColumnProfiler, Parser, TableMergeOperation};
use tracing::warn;

use crate::cli::TableArgs;

pub fn run(
    tables: TableArgs,
    mapping: PathBuf,
    transformations: PathBuf,
    output: Option<PathBuf>,
    allow_reuse: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let confirmed_mapping = super::load_mapping(&mapping)?;
    let confirmed_transformations = super::load_transformations(&transformations)?;

    // No model is involved in applying, so no manager is needed.
    let parser = Parser::new();
    let profiler = ColumnProfiler::new();
    let template: Arc<[ColumnInfo]> = profiler.profile(&parser.parse_file(&tables.template)?)?.into();

    let mut op = TableMergeOperation::new(template, parser.parse_file(&tables.incoming)?)
        .with_incoming_reuse(allow_reuse);
    op.profile(&profiler)?;
    op.confirm_mapping(confirmed_mapping)?;
    op.confirm_transformations(confirmed_transformations)?;

    let sink: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path).map_err(|e| format!("Cannot write {}: {}", path.display(), e))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(op.template_column_info().iter().map(|c| c.name.as_str()))?;

    let (mut written, mut failed) = (0usize, 0usize);
    for row in op.apply()? {
        match row {
            Ok(values) => {
                writer.write_record(values.values())?;
                written += 1;
            }
            Err(e) => {
                warn!(error = %e, "skipping row");
                failed += 1;
            }
        }
    }
    writer.flush()?;

    eprintln!(
        "{} {} rows{}",
        "Merged".green().bold(),
        written.to_string().white().bold(),
        output
            .as_ref()
            .map(|p| format!(" into {}", p.display()))
            .unwrap_or_default()
    );
    if failed > 0 {
        eprintln!(
            "{} {} rows failed to transform and were skipped",
            "warning:".yellow().bold(),
            failed
        );
    }

    Ok(())
}
