//! Mapping Suggester: one model call proposing template → incoming columns.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::llm::{LlmProvider, prompts};
use crate::schema::{ColumnInfo, ColumnMergeInfo};

use super::parser::StructuredParser;

/// Asks a model which incoming column feeds each template column.
#[derive(Clone)]
pub struct MappingSuggester {
    llm: Arc<dyn LlmProvider>,
    parser: StructuredParser,
}

impl MappingSuggester {
    pub fn new(llm: Arc<dyn LlmProvider>, parser: StructuredParser) -> Self {
        Self { llm, parser }
    }

    /// Propose a mapping covering every template column.
    ///
    /// Model call and parse failures are returned as errors. A parsed
    /// suggestion that misses, repeats or misnames columns is still returned,
    /// with each problem appended to its `errors`.
    pub fn suggest(
        &self,
        template: &[ColumnInfo],
        incoming: &[ColumnInfo],
    ) -> Result<ColumnMergeInfo> {
        let prompt = prompts::mapping_prompt(template, incoming);
        info!(
            provider = self.llm.name(),
            model = %self.llm.config().model,
            prompt_len = prompt.len(),
            repair = self.parser.repairs(),
            "requesting mapping suggestion"
        );

        let raw = self.llm.generate(&prompt)?;
        let mut merge_info: ColumnMergeInfo = self.parser.parse(&raw, &prompt, self.llm.as_ref())?;

        let problems = merge_info.coverage_problems(template, incoming);
        for problem in &problems {
            warn!(problem = %problem, "mapping suggestion incomplete");
        }
        merge_info.errors.extend(problems);

        Ok(merge_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;
    use crate::schema::{ColumnType, Confidence};

    fn cols(names: &[&str]) -> Vec<ColumnInfo> {
        names
            .iter()
            .map(|n| ColumnInfo::new(*n, ColumnType::String))
            .collect()
    }

    #[test]
    fn test_suggest_parses_complete_mapping() {
        let mock = Arc::new(MockProvider::with_responses([r#"```json
{"column_mapping": [
  {"template_column": "Name", "incoming_column": "FullName", "confidence": "high", "ambiguous_with": []},
  {"template_column": "Plan", "incoming_column": "Insurance_Plan", "confidence": "Medium", "ambiguous_with": ["Tier"]}
]}
```"#]));
        let suggester = MappingSuggester::new(mock.clone(), StructuredParser::new());

        let info = suggester
            .suggest(&cols(&["Name", "Plan"]), &cols(&["FullName", "Insurance_Plan", "Tier"]))
            .unwrap();

        assert!(info.errors.is_empty());
        assert_eq!(info.column_mapping[1].confidence, Confidence::Medium);
        assert!(info.column_mapping[1].is_ambiguous());
        assert!(mock.prompts()[0].contains("Insurance_Plan"));
    }

    #[test]
    fn test_missing_template_column_is_recorded() {
        let mock = Arc::new(MockProvider::with_responses([
            r#"{"column_mapping": [{"template_column": "Name", "incoming_column": "FullName", "confidence": "high"}]}"#,
        ]));
        let suggester = MappingSuggester::new(mock, StructuredParser::new());

        let info = suggester
            .suggest(&cols(&["Name", "Plan"]), &cols(&["FullName"]))
            .unwrap();

        assert_eq!(info.errors.len(), 1);
        assert!(info.errors[0].contains("'Plan' is missing"));
    }
}
