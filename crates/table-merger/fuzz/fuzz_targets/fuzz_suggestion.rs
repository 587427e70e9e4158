//! Fuzz target for the structured suggestion parser.
//!
//! Model output is untrusted: arbitrary completions must produce either a
//! parsed suggestion or a `SuggestionParse` error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use table_merger::{
    ColumnMergeInfo, ColumnTransformations, MergerError, MockProvider, StructuredParser,
};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    // Repair with an exhausted mock so every failure takes the full path.
    let primary = MockProvider::new();
    let parser = StructuredParser::new();

    match parser.parse::<ColumnMergeInfo>(&raw, "prompt", &primary) {
        Ok(_) | Err(MergerError::SuggestionParse { .. }) => {}
        Err(other) => panic!("unexpected error kind: {other}"),
    }
    match parser.parse::<ColumnTransformations>(&raw, "prompt", &primary) {
        Ok(_) | Err(MergerError::SuggestionParse { .. }) => {}
        Err(other) => panic!("unexpected error kind: {other}"),
    }
});
