//! Parsing of untrusted model output into typed suggestions.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{MergerError, Result};
use crate::llm::{LlmProvider, prompts};
use crate::schema::{ColumnMergeInfo, ColumnTransformations};

/// A structure a model is asked to produce as JSON.
pub trait StructuredOutput: DeserializeOwned {
    /// Short name used in log events.
    fn kind() -> &'static str;
}

impl StructuredOutput for ColumnMergeInfo {
    fn kind() -> &'static str {
        "column mapping"
    }
}

impl StructuredOutput for ColumnTransformations {
    fn kind() -> &'static str {
        "column transformations"
    }
}

/// Extract the JSON body from a completion, dropping Markdown code fences.
pub fn extract_json(response: &str) -> &str {
    if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(response)
    } else if response.contains("```") {
        response
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .unwrap_or(response)
    } else {
        response.trim()
    }
}

/// Strict parse of one completion.
pub fn parse_strict<T: StructuredOutput>(response: &str) -> std::result::Result<T, String> {
    serde_json::from_str(extract_json(response)).map_err(|e| e.to_string())
}

/// Two-stage parser: strict parse, then at most one repair round-trip.
///
/// The repair model receives the original prompt, the failed completion and
/// the parse error. With repair disabled the first failure is final.
#[derive(Clone)]
pub struct StructuredParser {
    repair_llm: Option<Arc<dyn LlmProvider>>,
    repair: bool,
}

impl StructuredParser {
    /// A parser that repairs with whichever model produced the output.
    pub fn new() -> Self {
        Self {
            repair_llm: None,
            repair: true,
        }
    }

    /// Use a distinct (usually cheaper) model for repairs.
    pub fn with_repair_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.repair_llm = Some(llm);
        self
    }

    /// Enable or disable the repair round-trip.
    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair = repair;
        self
    }

    /// Whether a failed parse triggers a repair call.
    pub fn repairs(&self) -> bool {
        self.repair
    }

    /// Parse `raw`, produced by `primary` in answer to `prompt`.
    pub fn parse<T: StructuredOutput>(
        &self,
        raw: &str,
        prompt: &str,
        primary: &dyn LlmProvider,
    ) -> Result<T> {
        let parse_error = match parse_strict::<T>(raw) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => e,
        };

        warn!(kind = T::kind(), error = %parse_error, "model output failed to parse");

        if !self.repair {
            return Err(MergerError::SuggestionParse {
                raw: raw.to_string(),
                parse_error,
                repair_error: None,
            });
        }

        let repairer: &dyn LlmProvider = match &self.repair_llm {
            Some(llm) => llm.as_ref(),
            None => primary,
        };
        debug!(kind = T::kind(), provider = repairer.name(), model = %repairer.config().model, "attempting repair");

        let repair_error = match repairer.generate(&prompts::repair_prompt(prompt, raw, &parse_error)) {
            Ok(repaired) => match parse_strict::<T>(&repaired) {
                Ok(parsed) => {
                    debug!(kind = T::kind(), "repair succeeded");
                    return Ok(parsed);
                }
                Err(e) => e,
            },
            Err(e) => e.to_string(),
        };

        warn!(kind = T::kind(), error = %repair_error, "repair failed");
        Err(MergerError::SuggestionParse {
            raw: raw.to_string(),
            parse_error,
            repair_error: Some(repair_error),
        })
    }
}

impl Default for StructuredParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;

    const VALID: &str = r#"{"transformations": [{"column_name": "A", "transformation_expression": "value"}]}"#;

    #[test]
    fn test_extract_json_from_fences() {
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("Here:\n```\n{}\n```"), "{}");
        assert_eq!(extract_json("  {}  "), "{}");
    }

    #[test]
    fn test_valid_output_skips_repair() {
        let primary = MockProvider::new();
        let parsed: ColumnTransformations = StructuredParser::new()
            .parse(VALID, "prompt", &primary)
            .unwrap();

        assert_eq!(parsed.transformations.len(), 1);
        assert_eq!(primary.call_count(), 0);
    }

    #[test]
    fn test_primary_repairs_when_no_repair_model() {
        let primary = MockProvider::with_responses([VALID]);
        let parsed: ColumnTransformations = StructuredParser::new()
            .parse("{\"transformations\": [", "the prompt", &primary)
            .unwrap();

        assert_eq!(parsed.transformations[0].column_name, "A");
        let prompts = primary.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("the prompt"));
        assert!(prompts[0].contains("{\"transformations\": ["));
    }

    #[test]
    fn test_repair_disabled_fails_fast() {
        let primary = MockProvider::with_responses([VALID]);
        let parser = StructuredParser::new().with_repair(false);
        assert!(!parser.repairs());
        assert!(StructuredParser::new().repairs());
        let err = parser
            .parse::<ColumnTransformations>("nope", "prompt", &primary)
            .unwrap_err();

        match err {
            MergerError::SuggestionParse { raw, repair_error, .. } => {
                assert_eq!(raw, "nope");
                assert!(repair_error.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(primary.call_count(), 0);
    }

    #[test]
    fn test_repair_call_failure_is_folded_in() {
        let primary = MockProvider::new();
        let err = StructuredParser::new()
            .parse::<ColumnMergeInfo>("nope", "prompt", &primary)
            .unwrap_err();

        match err {
            MergerError::SuggestionParse { repair_error: Some(e), .. } => {
                assert!(e.contains("no scripted response"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
