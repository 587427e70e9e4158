//! Error types for the table merger library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for table merger operations.
#[derive(Debug, Error)]
pub enum MergerError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The tabular input cannot be profiled (no columns, bad encoding, ...).
    #[error("Malformed table: {0}")]
    MalformedTable(String),

    /// Model output could not be parsed, even after the repair round-trip.
    #[error(
        "Unparsable model output: {parse_error} (repair: {})",
        .repair_error.as_deref().unwrap_or("not attempted")
    )]
    SuggestionParse {
        /// The raw text the model returned on the first attempt.
        raw: String,
        /// Error from parsing the raw text.
        parse_error: String,
        /// Error from the repair attempt, `None` when repair was skipped.
        repair_error: Option<String>,
    },

    /// An operation was invoked out of lifecycle order.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// A mapping or transformation set does not cover every template column exactly once.
    #[error("Incomplete coverage: {0}")]
    IncompleteCoverage(String),

    /// A column name that does not exist in the relevant table.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Two template columns resolve to the same incoming column.
    #[error("Incoming column '{incoming_column}' is mapped to several template columns: {}", .template_columns.join(", "))]
    SharedIncomingColumn {
        incoming_column: String,
        template_columns: Vec<String>,
    },

    /// A transformation expression failed to compile or evaluate.
    #[error("Transformation error in column '{column}'{}: {message}", .row.map(|r| format!(" at row {r}")).unwrap_or_default())]
    Transformation {
        column: String,
        row: Option<usize>,
        message: String,
    },

    /// The language model call itself failed.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for table merger operations.
pub type Result<T> = std::result::Result<T, MergerError>;
