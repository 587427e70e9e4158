//! String and date helpers callable from transformation expressions.

use std::fmt::Write;

use chrono::NaiveDate;
use evalexpr::{
    ContextWithMutableFunctions, EvalexprError, Function, HashMapContext, Value as EvalValue,
};
use regex::Regex;

use crate::input::DataTable;

/// Every function made available to expressions, with its argument list.
pub const FUNCTIONS: &[(&str, &str)] = &[
    ("lowercase", "s"),
    ("uppercase", "s"),
    ("trim", "s"),
    ("title_case", "s"),
    ("replace", "s, from, to"),
    ("regex_replace", "s, pattern, replacement"),
    ("substring", "s, start, length"),
    ("reformat_date", "s, from_format, to_format"),
    ("format_number", "s, decimals"),
];

/// `name(args)` for each entry of [`FUNCTIONS`], comma separated.
pub fn signatures() -> String {
    FUNCTIONS
        .iter()
        .map(|(name, args)| format!("{name}({args})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Register the expression functions on `context`.
pub fn register(context: &mut HashMapContext) -> Result<(), EvalexprError> {
    context.set_function(
        "lowercase".into(),
        Function::new(|arguments| {
            let args = expect_args(arguments, 1, "lowercase")?;
            let value = expect_string(&args[0], "value")?;
            Ok(EvalValue::String(value.to_lowercase()))
        }),
    )?;

    context.set_function(
        "uppercase".into(),
        Function::new(|arguments| {
            let args = expect_args(arguments, 1, "uppercase")?;
            let value = expect_string(&args[0], "value")?;
            Ok(EvalValue::String(value.to_uppercase()))
        }),
    )?;

    context.set_function(
        "trim".into(),
        Function::new(|arguments| {
            let args = expect_args(arguments, 1, "trim")?;
            let value = expect_string(&args[0], "value")?;
            Ok(EvalValue::String(value.trim().to_string()))
        }),
    )?;

    context.set_function(
        "title_case".into(),
        Function::new(|arguments| {
            let args = expect_args(arguments, 1, "title_case")?;
            let value = expect_string(&args[0], "value")?;
            Ok(EvalValue::String(title_case(value)))
        }),
    )?;

    context.set_function(
        "replace".into(),
        Function::new(|arguments| {
            let args = expect_args(arguments, 3, "replace")?;
            let value = expect_string(&args[0], "value")?;
            let from = expect_string(&args[1], "from")?;
            let to = expect_string(&args[2], "to")?;
            if from.is_empty() {
                return Ok(EvalValue::String(value.to_string()));
            }
            Ok(EvalValue::String(value.replace(from, to)))
        }),
    )?;

    context.set_function(
        "regex_replace".into(),
        Function::new(|arguments| {
            let args = expect_args(arguments, 3, "regex_replace")?;
            let value = expect_string(&args[0], "value")?;
            let pattern = expect_string(&args[1], "pattern")?;
            let replacement = expect_string(&args[2], "replacement")?;
            let regex = Regex::new(pattern)
                .map_err(|err| eval_error(&format!("Invalid regex: {err}")))?;
            Ok(EvalValue::String(
                regex.replace_all(value, replacement).into_owned(),
            ))
        }),
    )?;

    context.set_function(
        "substring".into(),
        Function::new(|arguments| {
            let args = expect_args(arguments, 3, "substring")?;
            let value = expect_string(&args[0], "value")?;
            let start = parse_i64_arg(&args[1], "start")?.max(0) as usize;
            let length = parse_i64_arg(&args[2], "length")?;
            if length <= 0 {
                return Ok(EvalValue::String(String::new()));
            }
            Ok(EvalValue::String(
                value.chars().skip(start).take(length as usize).collect(),
            ))
        }),
    )?;

    context.set_function(
        "reformat_date".into(),
        Function::new(|arguments| {
            let args = expect_args(arguments, 3, "reformat_date")?;
            let value = expect_string(&args[0], "value")?;
            let from = expect_string(&args[1], "from_format")?;
            let to = expect_string(&args[2], "to_format")?;
            reformat_date(value, from, to).map(EvalValue::String)
        }),
    )?;

    context.set_function(
        "format_number".into(),
        Function::new(|arguments| {
            let args = expect_args(arguments, 2, "format_number")?;
            let decimals = parse_i64_arg(&args[1], "decimals")?.clamp(0, 12) as usize;
            let number = match &args[0] {
                EvalValue::String(s) if DataTable::is_empty_value(s) => {
                    return Ok(EvalValue::String(String::new()));
                }
                EvalValue::String(s) => parse_number(s)?,
                EvalValue::Int(i) => *i as f64,
                EvalValue::Float(f) => *f,
                other => {
                    return Err(eval_error(&format!(
                        "Expected number for value, got {other:?}"
                    )));
                }
            };
            Ok(EvalValue::String(format!("{number:.decimals$}")))
        }),
    )?;

    Ok(())
}

/// Capitalise the first letter of each whitespace-separated word.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

fn reformat_date(value: &str, from: &str, to: &str) -> Result<String, EvalexprError> {
    if DataTable::is_empty_value(value) {
        return Ok(String::new());
    }
    let date = NaiveDate::parse_from_str(value.trim(), from).map_err(|err| {
        eval_error(&format!(
            "Cannot read '{value}' as a date with format '{from}': {err}"
        ))
    })?;
    // Time fields and unknown specifiers make the formatter fail.
    let mut out = String::new();
    write!(out, "{}", date.format(to)).map_err(|_| {
        eval_error(&format!(
            "Cannot render a date with format '{to}' (time fields and unknown specifiers are not supported)"
        ))
    })?;
    Ok(out)
}

fn parse_number(raw: &str) -> Result<f64, EvalexprError> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| eval_error(&format!("Cannot read '{raw}' as a number")))
}

fn expect_args(
    arguments: &EvalValue,
    expected: usize,
    name: &str,
) -> Result<Vec<EvalValue>, EvalexprError> {
    match arguments {
        EvalValue::Empty if expected == 0 => Ok(Vec::new()),
        value if expected == 1 && !matches!(value, EvalValue::Tuple(_)) => Ok(vec![value.clone()]),
        EvalValue::Tuple(values) => {
            if values.len() != expected {
                return Err(EvalexprError::wrong_function_argument_amount(
                    values.len(),
                    expected,
                ));
            }
            Ok(values.clone())
        }
        _ => Err(eval_error(&format!(
            "{name} expects {expected} arguments provided as a tuple"
        ))),
    }
}

fn eval_error(message: &str) -> EvalexprError {
    EvalexprError::CustomMessage(message.to_string())
}

fn parse_i64_arg(value: &EvalValue, name: &str) -> Result<i64, EvalexprError> {
    match value {
        EvalValue::Int(i) => Ok(*i),
        EvalValue::Float(f) => Ok(*f as i64),
        EvalValue::String(s) => s
            .trim()
            .parse()
            .map_err(|_| eval_error(&format!("Expected integer for {name}, got '{s}'"))),
        other => Err(eval_error(&format!(
            "Expected integer for {name}, got {other:?}",
        ))),
    }
}

fn expect_string<'a>(value: &'a EvalValue, name: &str) -> Result<&'a str, EvalexprError> {
    if let EvalValue::String(s) = value {
        Ok(s)
    } else {
        Err(eval_error(&format!("Expected string for {name}")))
    }
}
