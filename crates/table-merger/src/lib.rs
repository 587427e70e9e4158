//! Table Merger: LLM-assisted merging of incoming tables into a fixed template.
//!
//! A template table defines the target columns and the shape their values
//! should have. For each incoming table, a language model proposes which
//! incoming column feeds each template column and how its values should be
//! rewritten; a human confirms or edits both before any row is produced.
//!
//! # Core Principles
//!
//! - **Human in the loop**: suggestions are never applied until confirmed
//! - **Untrusted model output**: every completion is parsed strictly, with one repair retry
//! - **Explicit lifecycle**: out-of-order calls are errors, never silent no-ops
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use table_merger::{AnthropicProvider, TableMergerManager};
//!
//! let llm = Arc::new(AnthropicProvider::from_env().unwrap());
//! let mut manager = TableMergerManager::new(llm);
//! assert!(manager.ready_from_path("template.csv"));
//!
//! let mut op = manager.prep_csv_file_from_path("incoming.csv").unwrap();
//! let suggestion = op.suggest_mapping(&manager.mapping_suggester()).unwrap();
//! let mapping = suggestion.selected_mapping();
//! op.confirm_mapping(mapping).unwrap();
//!
//! let transformations = op
//!     .suggest_transformations(&manager.transformation_suggester())
//!     .unwrap()
//!     .as_map();
//! op.confirm_transformations(transformations).unwrap();
//!
//! for row in op.apply().unwrap() {
//!     println!("{:?}", row.unwrap());
//! }
//! ```

pub mod error;
pub mod input;
pub mod llm;
pub mod merge;
pub mod profile;
pub mod schema;
pub mod suggest;
pub mod transform;

pub use error::{MergerError, Result};
pub use input::{DataTable, Parser, ParserConfig};
pub use llm::{
    AnthropicProvider, LlmConfig, LlmProvider, MockProvider, OllamaProvider, OpenAIProvider,
};
pub use merge::{MergeState, MergedRows, MergerConfig, TableMergeOperation, TableMergerManager};
pub use profile::{ColumnProfiler, ProfilerConfig};
pub use schema::{
    ColumnInfo, ColumnMapping, ColumnMergeInfo, ColumnTransformation, ColumnTransformations,
    ColumnType, Confidence,
};
pub use suggest::{MappingSuggester, StructuredParser, TransformationSuggester};
