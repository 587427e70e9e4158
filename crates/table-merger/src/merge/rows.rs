//! Lazy row application.

use indexmap::IndexMap;
use tracing::warn;

use crate::error::Result;
use crate::input::DataTable;
use crate::transform::{CompiledTransformation, RowContext};

/// A template column bound to the incoming column that feeds it.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedColumn {
    /// Index of the mapped incoming column.
    pub source: usize,
    pub transformation: CompiledTransformation,
}

/// Merged output rows, produced one incoming row at a time.
///
/// Yields `Ok(row)` keyed by template column in template order, or the
/// first transformation error of that row. A failed row does not end the
/// sequence.
pub struct MergedRows<'a> {
    table: &'a DataTable,
    columns: &'a [ResolvedColumn],
    context: RowContext,
    next_row: usize,
}

impl<'a> MergedRows<'a> {
    pub(crate) fn new(table: &'a DataTable, columns: &'a [ResolvedColumn], context: RowContext) -> Self {
        Self {
            table,
            columns,
            context,
            next_row: 0,
        }
    }

    fn merge_row(&mut self, index: usize, row: &[String]) -> Result<IndexMap<String, String>> {
        self.context.bind_row(row)?;

        let mut out = IndexMap::with_capacity(self.columns.len());
        for column in self.columns {
            let raw = row.get(column.source).map(String::as_str).unwrap_or("");
            self.context.bind_value(raw)?;
            let value = column.transformation.evaluate(&self.context, index)?;
            out.insert(column.transformation.column().to_string(), value);
        }
        Ok(out)
    }
}

impl Iterator for MergedRows<'_> {
    type Item = Result<IndexMap<String, String>>;

    fn next(&mut self) -> Option<Self::Item> {
        let table = self.table;
        let row = table.rows.get(self.next_row)?;
        let index = self.next_row;
        self.next_row += 1;

        let merged = self.merge_row(index, row);
        if let Err(e) = &merged {
            warn!(row = index, error = %e, "row failed to merge");
        }
        Some(merged)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.row_count().saturating_sub(self.next_row);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MergedRows<'_> {}
