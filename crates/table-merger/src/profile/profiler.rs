//! Column profiling: type, format, emptiness and examples per column.

use tracing::debug;

use super::patterns::{self, ValueClass};
use crate::error::{MergerError, Result};
use crate::input::DataTable;
use crate::schema::{ColumnInfo, ColumnType};

/// Profiler configuration.
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// Number of example values kept per column.
    pub example_count: usize,
    /// Rows inspected for type, format and emptiness inference.
    pub inference_rows: usize,
    /// Maximum distinct values for a column to be summarized as an alternation.
    pub categorical_limit: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            example_count: 10,
            inference_rows: 1000,
            categorical_limit: 10,
        }
    }
}

impl ProfilerConfig {
    /// Set the number of example values kept per column.
    pub fn with_example_count(mut self, count: usize) -> Self {
        self.example_count = count;
        self
    }
}

/// Produces a [`ColumnInfo`] for every column of a table.
#[derive(Debug, Clone, Default)]
pub struct ColumnProfiler {
    config: ProfilerConfig,
}

impl ColumnProfiler {
    /// Create a profiler with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a profiler with custom settings.
    pub fn with_config(config: ProfilerConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Profile every column, in source column order.
    pub fn profile(&self, table: &DataTable) -> Result<Vec<ColumnInfo>> {
        if table.column_count() == 0 {
            return Err(MergerError::MalformedTable(
                "table has no columns".to_string(),
            ));
        }

        let columns: Vec<ColumnInfo> = (0..table.column_count())
            .map(|index| self.profile_column(table, index))
            .collect();

        debug!(
            columns = columns.len(),
            rows = table.row_count(),
            "profiled table"
        );
        Ok(columns)
    }

    /// Profile a single column by index.
    pub fn profile_column(&self, table: &DataTable, index: usize) -> ColumnInfo {
        let name = table.headers.get(index).cloned().unwrap_or_default();

        let example_values: Vec<String> = table
            .column_values(index)
            .take(self.config.example_count)
            .map(str::to_string)
            .collect();

        let sampled: Vec<&str> = table
            .column_values(index)
            .take(self.config.inference_rows)
            .collect();
        let empty_expected = sampled.iter().any(|v| DataTable::is_empty_value(v));
        let present: Vec<&str> = sampled
            .into_iter()
            .filter(|v| !DataTable::is_empty_value(v))
            .collect();

        let column_type = infer_type(&present);
        let output_format = match column_type {
            ColumnType::Date => patterns::date_format(&present)
                .unwrap_or_default()
                .to_string(),
            ColumnType::Number => {
                let pattern = patterns::number_pattern(&present);
                if patterns::matches_all(&pattern, &present) {
                    pattern
                } else {
                    patterns::string_pattern(&present, self.config.categorical_limit)
                }
            }
            ColumnType::String => {
                patterns::string_pattern(&present, self.config.categorical_limit)
            }
        };

        ColumnInfo {
            name,
            column_type,
            output_format,
            empty_expected,
            example_values,
        }
    }
}

/// Majority vote over value classes: date, then number, else string.
fn infer_type(values: &[&str]) -> ColumnType {
    if values.is_empty() {
        return ColumnType::String;
    }

    let (mut dates, mut numbers) = (0usize, 0usize);
    for value in values {
        match patterns::classify(value) {
            ValueClass::Date => dates += 1,
            ValueClass::Number => numbers += 1,
            ValueClass::Text => {}
        }
    }

    if dates * 2 > values.len() {
        ColumnType::Date
    } else if numbers * 2 > values.len() {
        ColumnType::Number
    } else {
        ColumnType::String
    }
}
