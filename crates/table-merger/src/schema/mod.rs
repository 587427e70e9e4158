//! Column profiles and the suggestion types built on them.

mod column;
mod mapping;
mod types;

pub use column::{ColumnInfo, column_names};
pub(crate) use mapping::check_exact_cover;
pub use mapping::{ColumnMapping, ColumnMergeInfo, ColumnTransformation, ColumnTransformations};
pub use types::{ColumnType, Confidence};
