//! Compiled transformation expressions and the per-row evaluation context.

use evalexpr::{
    ContextWithMutableVariables, DefaultNumericTypes, HashMapContext, Node, Value as EvalValue,
    build_operator_tree,
};

use std::collections::HashSet;

use tracing::warn;

use crate::error::{MergerError, Result};

use super::functions;

/// Name under which the mapped incoming value is bound.
pub const VALUE_VARIABLE: &str = "value";

/// Lowercase a column name and replace every non-alphanumeric character with `_`.
pub fn normalize_column_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' => c,
            _ => '_',
        })
        .collect::<String>()
        .to_ascii_lowercase()
}

/// One template column's expression, parsed once and evaluated per row.
#[derive(Debug, Clone)]
pub struct CompiledTransformation {
    column: String,
    expression: String,
    node: Node<DefaultNumericTypes>,
}

impl CompiledTransformation {
    /// Parse `expression`; a syntax error names the column it belongs to.
    pub fn compile(column: impl Into<String>, expression: impl Into<String>) -> Result<Self> {
        let column = column.into();
        let expression = expression.into();
        let node = build_operator_tree::<DefaultNumericTypes>(&expression).map_err(|e| {
            MergerError::Transformation {
                column: column.clone(),
                row: None,
                message: format!("cannot compile '{expression}': {e}"),
            }
        })?;
        Ok(Self {
            column,
            expression,
            node,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Evaluate against a bound row; `row` is only used in the error.
    pub fn evaluate(&self, context: &RowContext, row: usize) -> Result<String> {
        self.node
            .eval_with_context(&context.context)
            .map(render)
            .map_err(|e| MergerError::Transformation {
                column: self.column.clone(),
                row: Some(row),
                message: e.to_string(),
            })
    }
}

/// Render an evaluation result as output text.
fn render(value: EvalValue) -> String {
    match value {
        EvalValue::String(s) => s,
        EvalValue::Int(i) => i.to_string(),
        EvalValue::Float(f) => f.to_string(),
        EvalValue::Boolean(b) => b.to_string(),
        EvalValue::Tuple(values) => values
            .into_iter()
            .map(render)
            .collect::<Vec<_>>()
            .join("|"),
        EvalValue::Empty => String::new(),
    }
}

/// Variable bindings for one incoming row.
///
/// Functions are registered once; each row overwrites the column
/// variables, and each template column overwrites `value`.
pub struct RowContext {
    context: HashMapContext,
    bindings: Vec<Binding>,
}

/// Variable names for one incoming column. `name` is `None` when the
/// normalized header would shadow another binding.
struct Binding {
    name: Option<String>,
    by_index: String,
}

impl RowContext {
    /// Prepare bindings for a table with the given incoming headers.
    ///
    /// `c0..cN` and `value` always mean the positional column and the mapped
    /// value. A header that normalizes to one of those, or to the same name
    /// as an earlier header, is only reachable by position.
    pub fn new(headers: &[String]) -> Result<Self> {
        let mut context: HashMapContext = HashMapContext::new();
        functions::register(&mut context)
            .map_err(|e| MergerError::Config(format!("cannot register expression functions: {e}")))?;

        let positional: HashSet<String> = (0..headers.len()).map(|idx| format!("c{idx}")).collect();
        let mut taken: HashSet<String> = HashSet::new();
        let mut bindings = Vec::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            let by_index = format!("c{idx}");
            let canon = normalize_column_name(header);
            let name = if canon == VALUE_VARIABLE || positional.contains(&canon) {
                warn!(
                    header = %header,
                    variable = %canon,
                    position = %by_index,
                    "header shadows a reserved variable, bound by position only"
                );
                None
            } else if !taken.insert(canon.clone()) {
                warn!(
                    header = %header,
                    variable = %canon,
                    position = %by_index,
                    "header normalizes to an earlier column's name, bound by position only"
                );
                None
            } else {
                Some(canon)
            };
            bindings.push(Binding { name, by_index });
        }

        Ok(Self { context, bindings })
    }

    /// Bind every incoming column of `row` by normalized name and by index.
    pub fn bind_row(&mut self, row: &[String]) -> Result<()> {
        for (idx, binding) in self.bindings.iter().enumerate() {
            let raw = row.get(idx).cloned().unwrap_or_default();
            if let Some(name) = &binding.name {
                self.context
                    .set_value(name.clone(), EvalValue::String(raw.clone()))
                    .map_err(|e| bind_error(name, e))?;
            }
            self.context
                .set_value(binding.by_index.clone(), EvalValue::String(raw))
                .map_err(|e| bind_error(&binding.by_index, e))?;
        }
        Ok(())
    }

    /// Bind the mapped incoming value for the column about to be evaluated.
    pub fn bind_value(&mut self, value: &str) -> Result<()> {
        self.context
            .set_value(VALUE_VARIABLE.to_string(), EvalValue::String(value.to_string()))
            .map_err(|e| bind_error(VALUE_VARIABLE, e))
    }
}

fn bind_error(name: &str, e: evalexpr::EvalexprError) -> MergerError {
    MergerError::Config(format!("cannot bind expression variable '{name}': {e}"))
}

/// Compile and evaluate one expression against a single value.
///
/// Convenience for previews: no other incoming columns are bound.
pub fn evaluate_single(expression: &str, value: &str) -> Result<String> {
    let compiled = CompiledTransformation::compile(VALUE_VARIABLE, expression)?;
    let mut context = RowContext::new(&[])?;
    context.bind_value(value)?;
    compiled.evaluate(&context, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_row(expression: &str, headers: &[&str], row: &[&str], value: &str) -> Result<String> {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let row: Vec<String> = row.iter().map(|s| s.to_string()).collect();
        let compiled = CompiledTransformation::compile("Out", expression)?;
        let mut context = RowContext::new(&headers)?;
        context.bind_row(&row)?;
        context.bind_value(value)?;
        compiled.evaluate(&context, 1)
    }

    #[test]
    fn test_identity() {
        assert_eq!(evaluate_single("value", "Gold Plan").unwrap(), "Gold Plan");
    }

    #[test]
    fn test_date_reformat() {
        let out = evaluate_single(r#"reformat_date(value, "%m/%d/%Y", "%d-%m-%Y")"#, "05/01/2023");
        assert_eq!(out.unwrap(), "01-05-2023");
    }

    #[test]
    fn test_string_functions_compose() {
        assert_eq!(
            evaluate_single(r#"uppercase(replace(trim(value), " Plan", ""))"#, "  Gold Plan ")
                .unwrap(),
            "GOLD"
        );
        assert_eq!(
            evaluate_single(r#"regex_replace(value, "[^0-9]", "")"#, "AB-12345").unwrap(),
            "12345"
        );
        assert_eq!(evaluate_single("substring(value, 0, 2)", "AB-12345").unwrap(), "AB");
        assert_eq!(evaluate_single("format_number(value, 2)", "150").unwrap(), "150.00");
        assert_eq!(evaluate_single("format_number(value, 2)", "").unwrap(), "");
    }

    #[test]
    fn test_other_columns_are_bound() {
        let out = eval_row(
            r#"first_name + " " + c1"#,
            &["First Name", "Last-Name"],
            &["John", "Doe"],
            "John",
        );
        assert_eq!(out.unwrap(), "John Doe");
    }

    #[test]
    fn test_header_named_like_a_position_keeps_positional_meaning() {
        // "C1" would otherwise overwrite the binding for column 1.
        let headers = &["C1", "Plan"];
        let row = &["first", "Gold"];
        assert_eq!(eval_row("c1", headers, row, "").unwrap(), "Gold");
        assert_eq!(eval_row("c0", headers, row, "").unwrap(), "first");
        assert_eq!(eval_row("value", &["Value"], &["raw"], "mapped").unwrap(), "mapped");
    }

    #[test]
    fn test_colliding_headers_bind_first_by_name() {
        let headers = &["First Name", "first_name"];
        let row = &["John", "Jack"];
        assert_eq!(eval_row("first_name", headers, row, "").unwrap(), "John");
        assert_eq!(eval_row("c1", headers, row, "").unwrap(), "Jack");
    }

    #[test]
    fn test_conditional_and_non_string_results() {
        assert_eq!(
            evaluate_single(r#"if(value == "", "unknown", value)"#, "").unwrap(),
            "unknown"
        );
        assert_eq!(evaluate_single("1 + 2", "x").unwrap(), "3");
        assert_eq!(evaluate_single("value == \"x\"", "x").unwrap(), "true");
    }

    #[test]
    fn test_compiled_keeps_column_and_source() {
        let compiled = CompiledTransformation::compile("Plan", "title_case(value)").unwrap();
        assert_eq!(compiled.column(), "Plan");
        assert_eq!(compiled.expression(), "title_case(value)");
    }

    #[test]
    fn test_syntax_error_is_reported_at_compile() {
        let err = CompiledTransformation::compile("Date", "reformat_date(value,").unwrap_err();
        assert!(matches!(err, MergerError::Transformation { column, row: None, .. } if column == "Date"));
    }

    #[test]
    fn test_runtime_error_carries_row() {
        let err = eval_row(r#"reformat_date(value, "%Y", "%d")"#, &["d"], &["x"], "x").unwrap_err();
        assert!(matches!(err, MergerError::Transformation { row: Some(1), .. }));
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("Policy_No"), "policy_no");
        assert_eq!(normalize_column_name("Monthly Premium ($)"), "monthly_premium____");
    }
}
