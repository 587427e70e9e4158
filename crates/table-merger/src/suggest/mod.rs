//! Model-backed suggestions and the parser that makes their output safe to use.
//!
//! Model output is untrusted. Every completion goes through
//! [`StructuredParser`], which retries a malformed answer once through a
//! repair prompt before giving up with
//! [`SuggestionParse`](crate::MergerError::SuggestionParse).

mod mapping;
mod parser;
mod transformation;

pub use mapping::MappingSuggester;
pub use parser::{StructuredOutput, StructuredParser, extract_json, parse_strict};
pub use transformation::TransformationSuggester;
