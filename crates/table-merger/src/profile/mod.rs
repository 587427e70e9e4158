//! Column profiling for template and incoming tables.

pub mod patterns;
mod profiler;

pub use profiler::{ColumnProfiler, ProfilerConfig};
