//! Column profile definition.

use serde::{Deserialize, Serialize};

use super::types::ColumnType;

/// Profile of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name, unique within its table.
    pub name: String,
    /// Inferred value type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Regex (string/number) or chrono format string (date) describing the
    /// observed value shape. Empty when nothing could be observed.
    #[serde(default)]
    pub output_format: String,
    /// Whether at least one sampled value was empty.
    #[serde(default)]
    pub empty_expected: bool,
    /// First values of the column, in source order.
    #[serde(default)]
    pub example_values: Vec<String>,
}

impl ColumnInfo {
    /// Create a profile with no format or examples.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            output_format: String::new(),
            empty_expected: false,
            example_values: Vec::new(),
        }
    }

    /// Set the output format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    /// Set the example values.
    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.example_values = examples.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the column as expecting empty values.
    pub fn with_empty_expected(mut self, empty_expected: bool) -> Self {
        self.empty_expected = empty_expected;
        self
    }
}

/// Names of a column set, in order.
pub fn column_names(columns: &[ColumnInfo]) -> Vec<&str> {
    columns.iter().map(|c| c.name.as_str()).collect()
}
