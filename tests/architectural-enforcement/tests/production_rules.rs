//! Production source rules
//!
//! - The engine never blocks a runtime thread with `std::thread::sleep`,
//!   and never polls with `tokio::time::sleep`; it waits on channels and
//!   deadlines instead.
//! - Failures are propagated or turned into fallback state, never unwrapped.

use std::path::PathBuf;

use architectural_enforcement::{production_sources, report};

fn violations(needles: &[&str]) -> Vec<(PathBuf, usize, String)> {
    let mut found = Vec::new();
    for file in production_sources() {
        for needle in needles {
            for (line, text) in file.find(needle) {
                found.push((file.path.clone(), line, text));
            }
        }
    }
    found
}

#[test]
fn test_sources_are_found() {
    let sources = production_sources();
    assert!(
        sources.iter().any(|f| f.path.ends_with("companion.rs")),
        "enforcement scan did not find the engine sources"
    );
    assert!(sources.iter().any(|f| f.path.ends_with("main.rs")));
}

#[test]
fn test_no_sleep_in_production_code() {
    let found = violations(&["thread::sleep(", "time::sleep("]);
    assert!(
        found.is_empty(),
        "sleep calls in production code:\n{}",
        report(&found)
    );
}

#[test]
fn test_no_unwrap_or_expect_in_production_code() {
    let found = violations(&[".unwrap()", ".expect("]);
    assert!(
        found.is_empty(),
        "unwrap/expect in production code:\n{}",
        report(&found)
    );
}
