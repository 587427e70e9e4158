//! Input parsing and tabular data handling.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig};
pub use source::DataTable;
