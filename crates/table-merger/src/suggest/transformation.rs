//! Transformation Suggester: one model call proposing a value rule per template column.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::info;

use crate::error::Result;
use crate::llm::{LlmProvider, prompts};
use crate::schema::{ColumnInfo, ColumnTransformations};

use super::parser::StructuredParser;

/// Asks a model how to reshape mapped incoming values into template values.
#[derive(Clone)]
pub struct TransformationSuggester {
    llm: Arc<dyn LlmProvider>,
    parser: StructuredParser,
}

impl TransformationSuggester {
    pub fn new(llm: Arc<dyn LlmProvider>, parser: StructuredParser) -> Self {
        Self { llm, parser }
    }

    /// Propose exactly one transformation per template column.
    ///
    /// `mapping` is the confirmed template → incoming map. A parsed answer
    /// that does not cover the template exactly once is an
    /// [`IncompleteCoverage`](crate::MergerError::IncompleteCoverage) error.
    pub fn suggest(
        &self,
        mapping: &IndexMap<String, String>,
        template: &[ColumnInfo],
        incoming: &[ColumnInfo],
    ) -> Result<ColumnTransformations> {
        let prompt = prompts::transformation_prompt(mapping, template, incoming);
        info!(
            provider = self.llm.name(),
            model = %self.llm.config().model,
            prompt_len = prompt.len(),
            repair = self.parser.repairs(),
            "requesting transformation suggestion"
        );

        let raw = self.llm.generate(&prompt)?;
        let transformations: ColumnTransformations =
            self.parser.parse(&raw, &prompt, self.llm.as_ref())?;
        transformations.check_coverage(template)?;

        Ok(transformations)
    }
}
