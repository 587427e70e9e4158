//! In-memory tabular data.

use indexmap::IndexMap;

/// A parsed table: trimmed headers plus string cells.
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data as strings (row-major order), each row as wide as `headers`.
    pub rows: Vec<Vec<String>>,
    /// The delimiter used.
    pub delimiter: u8,
}

impl DataTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, delimiter: u8) -> Self {
        Self {
            headers,
            rows,
            delimiter,
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Data rows, header excluded.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column by header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Every cell of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(|s| s.as_str()).unwrap_or(""))
    }

    pub fn column_by_name(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(self.column_values(index).collect())
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// A row as an ordered header → value map.
    pub fn record(&self, row: usize) -> Option<IndexMap<&str, &str>> {
        let values = self.rows.get(row)?;
        Some(
            self.headers
                .iter()
                .zip(values.iter())
                .map(|(h, v)| (h.as_str(), v.as_str()))
                .collect(),
        )
    }

    /// Iterate all rows as header → value maps.
    pub fn records(&self) -> impl Iterator<Item = IndexMap<&str, &str>> {
        (0..self.rows.len()).filter_map(move |i| self.record(i))
    }

    /// Blank cells and the usual missing-value spellings (NA, N/A, null,
    /// none, nil) in any case.
    pub fn is_empty_value(value: &str) -> bool {
        const MISSING: [&str; 5] = ["na", "n/a", "null", "none", "nil"];
        let value = value.trim();
        value.is_empty() || MISSING.iter().any(|m| value.eq_ignore_ascii_case(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DataTable {
        DataTable::new(
            vec!["name".to_string(), "age".to_string()],
            vec![
                vec!["Alice".to_string(), "30".to_string()],
                vec!["Bob".to_string(), "25".to_string()],
            ],
            b',',
        )
    }

    #[test]
    fn test_record_preserves_header_order() {
        let t = table();
        let record = t.record(1).unwrap();
        let keys: Vec<&str> = record.keys().copied().collect();
        assert_eq!(keys, vec!["name", "age"]);
        assert_eq!(record["age"], "25");
        assert!(t.record(2).is_none());
    }

    #[test]
    fn test_column_by_name() {
        let t = table();
        assert_eq!(t.column_by_name("name"), Some(vec!["Alice", "Bob"]));
        assert_eq!(t.column_by_name("missing"), None);
        assert_eq!(t.records().count(), 2);
    }

    #[test]
    fn test_is_empty_value() {
        assert!(DataTable::is_empty_value(""));
        assert!(DataTable::is_empty_value("  "));
        assert!(DataTable::is_empty_value("NA"));
        assert!(DataTable::is_empty_value("n/a"));
        assert!(DataTable::is_empty_value("NULL"));
        assert!(!DataTable::is_empty_value("value"));
        assert!(!DataTable::is_empty_value("0"));
        assert!(!DataTable::is_empty_value("-"));
    }
}
