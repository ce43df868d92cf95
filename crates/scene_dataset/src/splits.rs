//! Deterministic train/test partition of scene directories.
//!
//! Scene directories are named with random hex digits, so reserving a couple of
//! leading characters for the test split yields a stable, roughly fixed-ratio
//! holdout that never depends on listing order or run-time state.

use crate::types::Split;

/// Name prefixes reserved for the test split.
pub const TEST_PREFIXES: &[&str] = &["0", "1"];

/// Hidden entries (dot-prefixed) belong to neither split.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

pub fn split_of(name: &str, test_prefixes: &[String]) -> Split {
    if test_prefixes.iter().any(|p| name.starts_with(p.as_str())) {
        Split::Test
    } else {
        Split::Train
    }
}

pub fn default_test_prefixes() -> Vec<String> {
    TEST_PREFIXES.iter().map(|p| p.to_string()).collect()
}

/// Partition names into (train, test), preserving input order within each side.
pub fn partition_names<S: AsRef<str>>(names: &[S], test_prefixes: &[String]) -> (Vec<String>, Vec<String>) {
    let mut train = Vec::new();
    let mut test = Vec::new();
    for name in names {
        let name = name.as_ref();
        match split_of(name, test_prefixes) {
            Split::Train => train.push(name.to_string()),
            Split::Test => test.push(name.to_string()),
        }
    }
    (train, test)
}
