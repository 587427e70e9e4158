//! One template, many incoming tables.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{MergerError, Result};
use crate::input::{DataTable, Parser, ParserConfig};
use crate::llm::LlmProvider;
use crate::profile::{ColumnProfiler, ProfilerConfig};
use crate::schema::ColumnInfo;
use crate::suggest::{MappingSuggester, StructuredParser, TransformationSuggester};

use super::operation::TableMergeOperation;

/// Configuration for a [`TableMergerManager`].
#[derive(Debug, Clone)]
pub struct MergerConfig {
    /// How template and incoming files are read.
    pub parser: ParserConfig,
    /// How columns are profiled.
    pub profiler: ProfilerConfig,
    /// Retry malformed model output once through a repair prompt.
    pub repair: bool,
    /// Let one incoming column feed several template columns.
    pub allow_incoming_reuse: bool,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            profiler: ProfilerConfig::default(),
            repair: true,
            allow_incoming_reuse: false,
        }
    }
}

/// Holds a template's profile and creates a [`TableMergeOperation`] per incoming table.
///
/// The template is profiled once by [`ready`](Self::ready); afterwards its
/// columns are shared read-only with every operation.
pub struct TableMergerManager {
    config: MergerConfig,
    parser: Parser,
    profiler: ColumnProfiler,
    llm: Arc<dyn LlmProvider>,
    repair_llm: Option<Arc<dyn LlmProvider>>,
    template_columns: Option<Arc<[ColumnInfo]>>,
    errors: Vec<String>,
}

impl TableMergerManager {
    /// Create a manager with default configuration.
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self::with_config(llm, MergerConfig::default())
    }

    /// Create a manager with custom configuration.
    pub fn with_config(llm: Arc<dyn LlmProvider>, config: MergerConfig) -> Self {
        Self {
            parser: Parser::with_config(config.parser.clone()),
            profiler: ColumnProfiler::with_config(config.profiler.clone()),
            config,
            llm,
            repair_llm: None,
            template_columns: None,
            errors: Vec::new(),
        }
    }

    /// Use a distinct model for repairing malformed output.
    pub fn with_repair_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.repair_llm = Some(llm);
        self
    }

    pub fn config(&self) -> &MergerConfig {
        &self.config
    }

    /// Whether the template has been profiled.
    pub fn is_ready(&self) -> bool {
        self.template_columns.is_some()
    }

    /// The template profile, once ready.
    pub fn template_columns(&self) -> Option<&[ColumnInfo]> {
        self.template_columns.as_deref()
    }

    /// Failures recorded by `ready`, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Profile the template read from `reader`.
    ///
    /// Returns whether the manager is ready. Once it is, later calls do
    /// nothing and return `true`.
    pub fn ready<R: Read>(&mut self, reader: R) -> bool {
        if self.is_ready() {
            return true;
        }
        let result = self.parser.parse_reader(reader);
        self.ready_with(result)
    }

    /// Profile the template stored at `path`.
    pub fn ready_from_path(&mut self, path: impl AsRef<Path>) -> bool {
        if self.is_ready() {
            return true;
        }
        let result = self.parser.parse_file(path);
        self.ready_with(result)
    }

    /// Profile an already-read template table.
    pub fn ready_from_table(&mut self, table: &DataTable) -> bool {
        if self.is_ready() {
            return true;
        }
        self.ready_with(Ok(table.clone()))
    }

    fn ready_with(&mut self, table: Result<DataTable>) -> bool {
        match table.and_then(|t| self.profiler.profile(&t)) {
            Ok(columns) => {
                info!(columns = columns.len(), "template profiled");
                self.template_columns = Some(columns.into());
                true
            }
            Err(e) => {
                warn!(error = %e, "template could not be profiled");
                self.errors.push(e.to_string());
                false
            }
        }
    }

    /// Start a merge of the incoming file at `path`.
    ///
    /// Fails only when the manager is not ready. An unreadable or
    /// unprofilable file yields an operation in the errored state.
    pub fn prep_csv_file_from_path(&self, path: impl AsRef<Path>) -> Result<TableMergeOperation> {
        let template = self.require_template()?;
        Ok(self.prep_parsed(template, self.parser.parse_file(path)))
    }

    /// Start a merge of the incoming table read from `reader`.
    pub fn prep_csv_file_from_reader<R: Read>(&self, reader: R) -> Result<TableMergeOperation> {
        let template = self.require_template()?;
        Ok(self.prep_parsed(template, self.parser.parse_reader(reader)))
    }

    /// Start a merge of an already-read incoming table.
    pub fn prep_table(&self, table: DataTable) -> Result<TableMergeOperation> {
        let template = self.require_template()?;
        Ok(self.prep_parsed(template, Ok(table)))
    }

    /// Mapping suggester backed by this manager's models.
    pub fn mapping_suggester(&self) -> MappingSuggester {
        MappingSuggester::new(self.llm.clone(), self.structured_parser())
    }

    /// Transformation suggester backed by this manager's models.
    pub fn transformation_suggester(&self) -> TransformationSuggester {
        TransformationSuggester::new(self.llm.clone(), self.structured_parser())
    }

    fn structured_parser(&self) -> StructuredParser {
        let parser = StructuredParser::new().with_repair(self.config.repair);
        match &self.repair_llm {
            Some(llm) => parser.with_repair_llm(llm.clone()),
            None => parser,
        }
    }

    fn require_template(&self) -> Result<Arc<[ColumnInfo]>> {
        self.template_columns.clone().ok_or_else(|| {
            MergerError::Precondition("template is not ready; call ready() first".to_string())
        })
    }

    fn prep_parsed(
        &self,
        template: Arc<[ColumnInfo]>,
        table: Result<DataTable>,
    ) -> TableMergeOperation {
        let table = match table {
            Ok(table) => table,
            Err(e) => {
                return TableMergeOperation::errored(template, &e)
                    .with_incoming_reuse(self.config.allow_incoming_reuse);
            }
        };

        let mut op = TableMergeOperation::new(template, table)
            .with_incoming_reuse(self.config.allow_incoming_reuse);
        // A failed profile is recorded on the operation itself.
        let _ = op.profile(&self.profiler);
        op
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;
    use crate::merge::MergeState;

    const TEMPLATE: &str = "Name,Plan\nJohn Doe,Gold\n";

    fn manager() -> TableMergerManager {
        TableMergerManager::new(Arc::new(MockProvider::new()))
    }

    #[test]
    fn test_prep_before_ready_is_precondition() {
        let m = manager();
        let err = m.prep_csv_file_from_reader("a,b\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, MergerError::Precondition(_)));
    }

    #[test]
    fn test_ready_is_idempotent() {
        let mut m = manager();
        assert!(m.ready(TEMPLATE.as_bytes()));
        let first = m.template_columns().unwrap().as_ptr();

        assert!(m.ready("Other\nx\n".as_bytes()));
        assert_eq!(m.template_columns().unwrap().as_ptr(), first);
        assert_eq!(m.template_columns().unwrap()[0].name, "Name");
    }

    #[test]
    fn test_failed_ready_records_error() {
        let mut m = manager();
        assert!(!m.ready(&[0xff, 0xfe, 0x00][..]));
        assert!(!m.is_ready());
        assert_eq!(m.errors().len(), 1);

        assert!(m.ready(TEMPLATE.as_bytes()));
        assert_eq!(m.errors().len(), 1);
    }

    #[test]
    fn test_prep_profiles_incoming() {
        let mut m = manager();
        assert!(m.ready(TEMPLATE.as_bytes()));

        let op = m
            .prep_csv_file_from_reader("FullName,Insurance_Plan\nJane,Silver\n".as_bytes())
            .unwrap();
        assert_eq!(op.state(), MergeState::Profiled);
        assert_eq!(op.template_column_info().len(), 2);
        assert_eq!(op.incoming_column_info()[1].name, "Insurance_Plan");
    }

    #[test]
    fn test_unprofilable_incoming_yields_errored_operation() {
        let mut m = manager();
        assert!(m.ready(TEMPLATE.as_bytes()));

        let op = m.prep_csv_file_from_reader("a,a\n1,2\n".as_bytes()).unwrap();
        assert!(op.is_errored());
        assert!(!op.errors().is_empty());
    }
}
