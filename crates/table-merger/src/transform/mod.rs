//! Transformation expression language.
//!
//! A transformation is an [`evalexpr`] expression evaluated once per
//! incoming row. The mapped incoming value is bound as `value`; every
//! incoming column is also bound under its normalized name
//! (`Policy No` → `policy_no`) and by position (`c0`, `c1`, ...).
//!
//! On top of the evalexpr built-ins the following functions are registered:
//! `lowercase`, `uppercase`, `trim`, `title_case`, `replace`,
//! `regex_replace`, `substring`, `reformat_date` and `format_number`.
//!
//! ```
//! use table_merger::transform::evaluate_single;
//!
//! let out = evaluate_single(r#"reformat_date(value, "%m/%d/%Y", "%d-%m-%Y")"#, "05/01/2023").unwrap();
//! assert_eq!(out, "01-05-2023");
//! ```

mod expression;
mod functions;

pub use expression::{
    CompiledTransformation, RowContext, VALUE_VARIABLE, evaluate_single, normalize_column_name,
};
pub use functions::{FUNCTIONS, signatures, title_case};
