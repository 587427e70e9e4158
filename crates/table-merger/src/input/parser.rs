//! CSV/TSV reader with delimiter detection.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::debug;

use super::source::DataTable;
use crate::error::{MergerError, Result};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Whether the file has a header row.
    pub has_header: bool,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Parses tabular data files.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file on disk.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<DataTable> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| MergerError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse_reader(file).map_err(|e| match e {
            MergerError::Io { source, .. } => MergerError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse everything readable from `reader`.
    pub fn parse_reader<R: Read>(&self, mut reader: R) -> Result<DataTable> {
        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .map_err(|e| MergerError::Io {
                path: "<reader>".into(),
                source: e,
            })?;
        self.parse_bytes(&contents)
    }

    /// Parse in-memory text.
    pub fn parse_str(&self, text: &str) -> Result<DataTable> {
        self.parse_bytes(text.as_bytes())
    }

    /// Parse raw bytes, which must be UTF-8. A leading byte order mark is dropped.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<DataTable> {
        if std::str::from_utf8(bytes).is_err() {
            return Err(MergerError::MalformedTable(
                "input is not valid UTF-8".to_string(),
            ));
        }
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(bytes)?,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let mut records = reader.records();

        let headers: Vec<String> = if self.config.has_header {
            match records.next() {
                Some(record) => record?.iter().map(|s| s.trim().to_string()).collect(),
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let mut rows: Vec<Vec<String>> = Vec::new();
        for result in records {
            if let Some(max) = self.config.max_rows {
                if rows.len() >= max {
                    break;
                }
            }
            let record = result?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        let headers = if self.config.has_header {
            headers
        } else {
            // Generate column names
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            (0..width).map(|i| format!("column_{}", i + 1)).collect()
        };

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(MergerError::MalformedTable("no columns found".to_string()));
        }

        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(MergerError::MalformedTable(format!(
                    "duplicate column name '{}'",
                    header
                )));
            }
        }

        let expected_cols = headers.len();
        for row in &mut rows {
            // Pad short rows, truncate long ones
            row.resize(expected_cols, String::new());
        }

        debug!(
            columns = expected_cols,
            rows = rows.len(),
            delimiter = %(delimiter as char).escape_default(),
            "parsed table"
        );

        Ok(DataTable::new(headers, rows, delimiter))
    }
}

/// Lines sampled when guessing the delimiter.
const SNIFF_LINES: usize = 10;

/// Pick the candidate whose per-line count agrees on the most sampled
/// lines, then the one splitting into more fields. Earlier candidates win
/// ties; a file with no candidate at all is read as single-column CSV.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let sample: Vec<String> = BufReader::new(bytes)
        .lines()
        .map_while(|line| line.ok())
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    if sample.is_empty() {
        return Err(MergerError::MalformedTable("no lines to read".to_string()));
    }

    let mut best: Option<(u8, usize, usize)> = None;
    for &candidate in DELIMITERS {
        let Some((count, agreeing)) = modal_count(&sample, candidate) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((_, best_count, best_agreeing)) => {
                (agreeing, count) > (best_agreeing, best_count)
            }
        };
        if better {
            best = Some((candidate, count, agreeing));
        }
    }

    let delimiter = best.map(|(d, _, _)| d).unwrap_or(b',');
    debug!(delimiter = %(delimiter as char).escape_default(), "detected delimiter");
    Ok(delimiter)
}

/// Most common non-zero unquoted occurrence count of `delimiter` per line,
/// with how many lines share it.
fn modal_count(lines: &[String], delimiter: u8) -> Option<(usize, usize)> {
    let mut tally: Vec<(usize, usize)> = Vec::new();
    for line in lines {
        let count = unquoted_occurrences(line, delimiter as char);
        if count == 0 {
            continue;
        }
        match tally.iter_mut().find(|(c, _)| *c == count) {
            Some((_, lines_with_count)) => *lines_with_count += 1,
            None => tally.push((count, 1)),
        }
    }
    tally
        .into_iter()
        .max_by(|(ca, na), (cb, nb)| na.cmp(nb).then(ca.cmp(cb)))
}

fn unquoted_occurrences(line: &str, delimiter: char) -> usize {
    let mut quoted = false;
    line.chars()
        .filter(|&ch| {
            if ch == '"' {
                quoted = !quoted;
            }
            ch == delimiter && !quoted
        })
        .count()
}
