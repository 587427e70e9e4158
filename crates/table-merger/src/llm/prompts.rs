//! Prompt templates for LLM interactions.

use indexmap::IndexMap;

use crate::schema::ColumnInfo;
use crate::transform;

/// Render a column set as a readable profile listing.
fn describe_columns(columns: &[ColumnInfo]) -> String {
    columns
        .iter()
        .map(|col| {
            let examples = if col.example_values.is_empty() {
                "none".to_string()
            } else {
                col.example_values
                    .iter()
                    .map(|v| format!("\"{}\"", v))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let format = if col.output_format.is_empty() {
                "unknown"
            } else {
                col.output_format.as_str()
            };
            format!(
                "- {}\n  type: {}\n  format: {}\n  empty values expected: {}\n  examples: {}",
                col.name, col.column_type, format, col.empty_expected, examples
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build a prompt asking for a template → incoming column mapping.
pub fn mapping_prompt(template: &[ColumnInfo], incoming: &[ColumnInfo]) -> String {
    format!(
        r#"Match the columns of an incoming table to the columns of a template table.

## Template Columns
{}

## Incoming Columns
{}

## Task
For EVERY template column, pick the incoming column that holds the same information.
Judge by column name, value type, value format and example values. The incoming
values may be formatted differently from the template; that is fine.

- Every template column must appear exactly once in your answer.
- Use each incoming column for at most one template column.
- confidence is "high", "medium" or "low".
- ambiguous_with lists other incoming columns that could also fit this template
  column; use an empty list when the choice is clear.
- Use column names exactly as written above.

Respond with a JSON object only:
{{
  "column_mapping": [
    {{
      "template_column": "template column name",
      "incoming_column": "incoming column name",
      "confidence": "high|medium|low",
      "ambiguous_with": ["other incoming column name"]
    }}
  ]
}}"#,
        describe_columns(template),
        describe_columns(incoming)
    )
}

/// Build a prompt asking for one transformation expression per template column.
pub fn transformation_prompt(
    mapping: &IndexMap<String, String>,
    template: &[ColumnInfo],
    incoming: &[ColumnInfo],
) -> String {
    let pairs = template
        .iter()
        .map(|t| {
            let source = mapping
                .get(&t.name)
                .and_then(|name| incoming.iter().find(|c| &c.name == name));
            match source {
                Some(source) => format!(
                    "### {} <- {}\nTemplate:\n{}\nIncoming:\n{}",
                    t.name,
                    source.name,
                    describe_columns(std::slice::from_ref(t)),
                    describe_columns(std::slice::from_ref(source))
                ),
                None => format!(
                    "### {} <- (no incoming column)\nTemplate:\n{}",
                    t.name,
                    describe_columns(std::slice::from_ref(t))
                ),
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    let functions = transform::signatures();

    format!(
        r#"Write value transformations that turn incoming values into the template's format.

## Column Pairs
{pairs}

## Expression Language
Each transformation is a single expression evaluated once per row.
- `value` is the raw text of the mapped incoming column for that row.
- Other incoming columns are available by name, lowercased with every
  non-alphanumeric character replaced by `_` (e.g. `policy_no`).
- String literals use double quotes; `+` concatenates strings.
- `if(condition, a, b)` picks a value.
- Functions: {functions}.
- Date formats use strftime tokens such as "%Y-%m-%d" or "%d/%m/%Y".
- When no change is needed, the expression is just `value`.

## Task
Give exactly one transformation for EVERY template column listed above, so that
transformed incoming values look like the template's example values.

Respond with a JSON object only:
{{
  "transformations": [
    {{
      "column_name": "template column name",
      "transformation_expression": "expression"
    }}
  ]
}}"#
    )
}

/// Build a prompt asking the model to fix a completion that failed to parse.
pub fn repair_prompt(original_prompt: &str, completion: &str, error: &str) -> String {
    format!(
        r#"Prompt:
{original_prompt}

Completion:
{completion}

Above, the Completion did not satisfy the constraints given in the Prompt.
Details: {error}

Please try again. Respond with the corrected JSON object only, no commentary."#
    )
}

/// System prompt for all table merger LLM interactions.
pub fn system_prompt() -> &'static str {
    r#"You are a data integration assistant that helps merge tabular files into a fixed template.

Your role is to:
1. Match columns of incoming tables to template columns
2. Write small expressions that convert incoming values into the template's format

Guidelines:
- Be precise; use column names exactly as given
- Prefer the simplest transformation that produces the template's format
- Flag uncertainty through confidence and alternatives rather than guessing silently
- Always respond with valid JSON when requested"#
}
