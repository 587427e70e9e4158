//! Value classification and pattern summaries.

use std::collections::HashSet;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

// =============================================================================
// LAZY STATIC PATTERNS
// =============================================================================

static PLAIN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap());

static GROUPED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").unwrap());

/// Date formats tried in order. Month-first comes before day-first so that
/// fully ambiguous columns resolve the US way.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%B %d, %Y",
];

/// Coarse class of a single non-empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Date,
    Number,
    Text,
}

/// Classify one non-empty value.
pub fn classify(value: &str) -> ValueClass {
    let value = value.trim();
    if parses_as_date(value) {
        ValueClass::Date
    } else if is_number(value) {
        ValueClass::Number
    } else {
        ValueClass::Text
    }
}

/// Whether the value parses under any known date format.
pub fn parses_as_date(value: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
}

/// Whether the value is a plain or thousands-grouped decimal.
pub fn is_number(value: &str) -> bool {
    PLAIN_NUMBER.is_match(value) || GROUPED_NUMBER.is_match(value)
}

/// The date format that parses the most values; earlier formats win ties.
pub fn date_format(values: &[&str]) -> Option<&'static str> {
    let mut best: Option<(&'static str, usize)> = None;
    for &fmt in DATE_FORMATS {
        let hits = values
            .iter()
            .filter(|v| NaiveDate::parse_from_str(v.trim(), fmt).is_ok())
            .count();
        if hits > 0 && best.is_none_or(|(_, b)| hits > b) {
            best = Some((fmt, hits));
        }
    }
    best.map(|(fmt, _)| fmt)
}

/// Regex summary for numeric values.
///
/// Only values that look like numbers shape the pattern; callers check
/// coverage with [`matches_all`] and fall back to [`string_pattern`].
pub fn number_pattern(values: &[&str]) -> String {
    let numbers: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| is_number(v))
        .collect();
    if numbers.is_empty() {
        return String::new();
    }

    let sign = match (
        numbers.iter().any(|v| v.starts_with('+')),
        numbers.iter().any(|v| v.starts_with('-')),
    ) {
        (true, true) => "[+-]?",
        (true, false) => "\\+?",
        (false, true) => "-?",
        (false, false) => "",
    };

    if numbers.iter().any(|v| v.contains(',')) {
        // Grouped and ungrouped integer parts can share a column.
        return format!("^{sign}([0-9]{{1,3}}(,[0-9]{{3}})+|[0-9]+)(\\.[0-9]+)?$");
    }

    let fraction_lengths: HashSet<Option<usize>> = numbers
        .iter()
        .map(|v| v.split_once('.').map(|(_, frac)| frac.len()))
        .collect();

    if fraction_lengths.len() == 1 {
        match fraction_lengths.into_iter().next().flatten() {
            None => format!("^{sign}[0-9]+$"),
            Some(k) => format!("^{sign}[0-9]+\\.[0-9]{{{k}}}$"),
        }
    } else {
        format!("^{sign}[0-9]+(\\.[0-9]+)?$")
    }
}

/// Whether `pattern` compiles and matches every value.
pub fn matches_all(pattern: &str, values: &[&str]) -> bool {
    Regex::new(pattern).is_ok_and(|re| values.iter().all(|v| re.is_match(v)))
}

/// Regex summary for text values.
pub fn string_pattern(values: &[&str], categorical_limit: usize) -> String {
    let values: Vec<&str> = values.iter().copied().filter(|v| !v.trim().is_empty()).collect();
    if values.is_empty() {
        return String::new();
    }

    if let Some(shape) = shared(&values, |v| shape(v, false)) {
        return format!("^{shape}$");
    }

    let mut distinct: Vec<&str> = Vec::new();
    for &value in &values {
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    if distinct.len() <= categorical_limit && distinct.len() < values.len() {
        let alternatives: Vec<String> = distinct.iter().map(|v| regex::escape(v)).collect();
        return format!("^({})$", alternatives.join("|"));
    }

    if let Some(shape) = shared(&values, |v| shape(v, true)) {
        return format!("^{shape}$");
    }

    format!("^[{}]+$", class_union(&values))
}

/// The common result of `f` over all values, if there is one.
fn shared(values: &[&str], f: impl Fn(&str) -> String) -> Option<String> {
    let first = f(values[0]);
    values[1..].iter().all(|v| f(v) == first).then_some(first)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Upper,
    Lower,
    Digit,
    Other(char),
}

impl CharClass {
    fn of(c: char) -> Self {
        if c.is_ascii_uppercase() {
            CharClass::Upper
        } else if c.is_ascii_lowercase() {
            CharClass::Lower
        } else if c.is_ascii_digit() {
            CharClass::Digit
        } else {
            CharClass::Other(c)
        }
    }

    fn pattern(&self) -> String {
        match self {
            CharClass::Upper => "[A-Z]".to_string(),
            CharClass::Lower => "[a-z]".to_string(),
            CharClass::Digit => "[0-9]".to_string(),
            CharClass::Other(c) => regex::escape(&c.to_string()),
        }
    }
}

/// Collapse a value into runs of character classes.
///
/// Exact shapes keep run lengths (`[A-Z]{2}-[0-9]{5}`); loose shapes keep
/// single characters and turn longer runs into `+` (`[A-Z][a-z]+`).
fn shape(value: &str, loose: bool) -> String {
    let mut out = String::new();
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        let class = CharClass::of(c);
        let mut run = 1;
        if !matches!(class, CharClass::Other(_)) {
            while chars.peek().is_some_and(|next| CharClass::of(*next) == class) {
                chars.next();
                run += 1;
            }
        }

        out.push_str(&class.pattern());
        match (run, loose) {
            (1, _) => {}
            (_, true) => out.push('+'),
            (n, false) => out.push_str(&format!("{{{n}}}")),
        }
    }

    out
}

/// Character class body covering every character seen.
fn class_union(values: &[&str]) -> String {
    let (mut upper, mut lower, mut digit) = (false, false, false);
    let mut others: Vec<char> = Vec::new();

    for c in values.iter().flat_map(|v| v.chars()) {
        match CharClass::of(c) {
            CharClass::Upper => upper = true,
            CharClass::Lower => lower = true,
            CharClass::Digit => digit = true,
            CharClass::Other(o) => {
                if !others.contains(&o) {
                    others.push(o);
                }
            }
        }
    }
    others.sort_unstable();

    let mut body = String::new();
    if upper {
        body.push_str("A-Z");
    }
    if lower {
        body.push_str("a-z");
    }
    if digit {
        body.push_str("0-9");
    }
    for o in others {
        body.push_str(&regex::escape(&o.to_string()));
    }
    body
}
