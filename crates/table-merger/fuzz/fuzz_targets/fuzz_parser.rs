//! Fuzz target for the tabular reader and profiler.
//!
//! The reader and profiler must never panic on malformed input, whatever
//! the delimiter, quoting or encoding.

#![no_main]

use libfuzzer_sys::fuzz_target;
use table_merger::{ColumnProfiler, Parser};

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    if let Ok(table) = Parser::new().parse_bytes(data) {
        let _ = ColumnProfiler::new().profile(&table);
    }
});
