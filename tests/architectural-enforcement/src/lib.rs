//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! on the production sources of the workspace:
//! - No blocking sleeps; the engine only waits on channels and timers
//! - No `unwrap()` / `expect()` outside of tests
//!
//! Test modules (everything from the first `#[cfg(test)]` on) are ignored.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Production crates checked by the enforcement tests, relative to the
/// workspace root
pub const PRODUCTION_CRATES: &[&str] = &["companion/core/src", "companion/cli/src"];

/// A production source file with its test module stripped
#[derive(Debug)]
pub struct SourceFile {
    /// Path on disk
    pub path: PathBuf,
    /// Content up to the first `#[cfg(test)]`
    pub production: String,
}

impl SourceFile {
    /// Lines matching `needle`, skipping comments, as `(line number, line)`
    pub fn find(&self, needle: &str) -> Vec<(usize, String)> {
        self.production
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let trimmed = line.trim_start();
                !trimmed.starts_with("//") && line.contains(needle)
            })
            .map(|(i, line)| (i + 1, line.trim().to_string()))
            .collect()
    }
}

/// Workspace root, derived from this crate's manifest directory
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Strip everything from the first `#[cfg(test)]` on
pub fn production_part(source: &str) -> &str {
    source
        .find("#[cfg(test)]")
        .map_or(source, |index| &source[..index])
}

/// Every `.rs` file under the production crates
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_CRATES {
        for entry in WalkDir::new(root.join(dir))
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        {
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            files.push(SourceFile {
                path: entry.path().to_path_buf(),
                production: production_part(&content).to_string(),
            });
        }
    }

    files
}

/// Format violations for an assertion message
pub fn report(violations: &[(PathBuf, usize, String)]) -> String {
    violations
        .iter()
        .map(|(path, line, text)| format!("  {}:{line}: {text}", path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_part_cuts_test_module() {
        let source = "fn a() {}\n#[cfg(test)]\nmod tests { fn b() { x.unwrap(); } }";
        assert_eq!(production_part(source), "fn a() {}\n");
        assert_eq!(production_part("fn a() {}"), "fn a() {}");
    }

    #[test]
    fn test_find_skips_comments() {
        let file = SourceFile {
            path: PathBuf::from("x.rs"),
            production: "// x.unwrap()\nlet y = x.unwrap();\n".to_string(),
        };
        assert_eq!(file.find(".unwrap()"), vec![(2, "let y = x.unwrap();".to_string())]);
    }
}
