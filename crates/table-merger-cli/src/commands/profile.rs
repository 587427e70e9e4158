//! Profile command - print the column profile of a file.

use std::path::PathBuf;

use colored::Colorize;
use table_merger::{ColumnProfiler, Parser, ProfilerConfig};

pub fn run(file: PathBuf, examples: usize) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    eprintln!(
        "{} {}",
        "Profiling".cyan().bold(),
        file.display().to_string().white()
    );

    let table = Parser::new().parse_file(&file)?;
    let profiler = ColumnProfiler::with_config(ProfilerConfig::default().with_example_count(examples));
    let columns = profiler.profile(&table)?;

    eprintln!(
        "Found {} columns in {} rows",
        columns.len().to_string().white().bold(),
        table.row_count().to_string().white().bold()
    );

    super::write_json(&columns, None)
}
