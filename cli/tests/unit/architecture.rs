//! Structural tests for layer boundaries.
//!
//! These scan `src/` for imports that cross layers.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Track brace depth and report whether a line is inside a `#[cfg(test)]` block.
#[derive(Default)]
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().starts_with("#[cfg(") && line.contains("test") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Non-test, non-comment lines of every file under `src/<layer>`, skipping
/// files whose name is in `skip`.
fn production_lines(layer: &str, skip: &[&str]) -> Vec<(String, usize, String)> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut out = Vec::new();
    for file in collect_rs_files(&root.join("src").join(layer)) {
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if skip.contains(&name) {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let rel = file
            .strip_prefix(root)
            .unwrap_or(&file)
            .display()
            .to_string();
        let mut tracker = CfgTestTracker::default();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") {
                continue;
            }
            out.push((rel.clone(), i + 1, line.to_string()));
        }
    }
    out
}

fn assert_no_match(layer: &str, skip: &[&str], forbidden: &[&str]) {
    let violations: Vec<String> = production_lines(layer, skip)
        .into_iter()
        .filter(|(_, _, line)| forbidden.iter().any(|f| line.contains(f)))
        .map(|(file, lineno, line)| format!("{file}:{lineno}: {}", line.trim()))
        .collect();
    assert!(
        violations.is_empty(),
        "`{layer}` crosses a layer boundary:\n{}",
        violations.join("\n")
    );
}

#[test]
fn domain_is_pure() {
    assert_no_match(
        "domain",
        &[],
        &[
            "crate::application",
            "crate::infra",
            "crate::commands",
            "crate::output",
            "tokio",
            "std::fs",
            "std::process",
            "std::net",
        ],
    );
}

#[test]
fn application_does_not_reach_into_adapters() {
    assert_no_match(
        "application",
        &["test_support.rs"],
        &["crate::infra", "crate::commands", "crate::output", "crate::app::"],
    );
}

#[test]
fn infra_does_not_depend_on_presentation() {
    assert_no_match("infra", &[], &["crate::commands", "crate::output", "crate::app::"]);
}

#[test]
fn processes_are_spawned_only_by_the_command_runner() {
    for layer in ["domain", "application", "commands", "output"] {
        assert_no_match(layer, &[], &["Command::new("]);
    }
    assert_no_match("infra", &["command_runner.rs"], &["Command::new("]);
}

#[test]
fn validated_configuration_has_no_public_fields() {
    let lines = production_lines("domain", &[]);
    let mut in_struct = false;
    let mut seen = false;
    let mut public = Vec::new();
    for (file, lineno, line) in lines {
        let trimmed = line.trim();
        if trimmed.starts_with("pub struct Configuration") {
            in_struct = true;
            seen = true;
            continue;
        }
        if in_struct {
            if trimmed == "}" {
                break;
            }
            if trimmed.starts_with("pub ") {
                public.push(format!("{file}:{lineno}: {trimmed}"));
            }
        }
    }
    assert!(seen, "Configuration struct not found under src/domain");
    assert!(
        public.is_empty(),
        "Configuration exposes mutable fields:\n{}",
        public.join("\n")
    );
}
