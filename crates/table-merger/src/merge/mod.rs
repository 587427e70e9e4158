//! Merge Operation and Merger Manager.

mod manager;
mod operation;
mod rows;

pub use manager::{MergerConfig, TableMergerManager};
pub use operation::{MergeState, TableMergeOperation};
pub use rows::MergedRows;
