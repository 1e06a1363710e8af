//! Architecture guard tests for the aigw workspace.
//!
//! These tests scan source files to keep the codebase consistent:
//! - Error types derive thiserror
//! - No `Result<_, String>` in aigw-core
//! - Every provider adapter is registered in the default adapter set
//! - The library logs through tracing, never stdout/stderr
//! - File size limits
//!
//! Run: `cargo test --package aigw-core --test architecture_guards -- --nocapture`

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_rs_files(&path));
        } else if path.extension().is_some_and(|e| e == "rs") {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// Workspace root, two levels up from crates/aigw-core
fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("cannot determine workspace root")
        .to_path_buf()
}

/// Library sources of every crate, integration tests excluded
fn source_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(crates) = fs::read_dir(root.join("crates")) {
        for krate in crates.flatten() {
            files.extend(collect_rs_files(&krate.path().join("src")));
        }
    }
    files.sort();
    files
}

/// Source text before the first inline test module
fn non_test_code(content: &str) -> &str {
    match content.find("#[cfg(test)]") {
        Some(pos) => &content[..pos],
        None => content,
    }
}

fn rel(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

fn is_comment(line: &str) -> bool {
    line.starts_with("//") || line.starts_with('*')
}

fn report(rule: &str, hint: &str, violations: &[(String, usize, String)]) {
    if violations.is_empty() {
        return;
    }
    let mut msg = format!("\n[{rule}] {hint}\n\n");
    for (file, line, text) in violations {
        msg.push_str(&format!("  {}:{} -> {}\n", file, line, text));
    }
    msg.push_str("\nAdd to the allowlist in architecture_guards.rs if intentional.\n");
    panic!("{msg}");
}

#[test]
fn test_error_types_use_thiserror() {
    let root = workspace_root();
    let allowlist: HashSet<&str> = [
        // ProviderErrorKind is a failure class, not an error type
        "crates/aigw-core/src/error/types.rs",
    ]
    .into_iter()
    .collect();

    let mut violations = Vec::new();
    for file in source_files(&root) {
        let relative = rel(&file, &root);
        if allowlist.contains(relative.as_str()) {
            continue;
        }
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("impl") && trimmed.contains("Display for") && trimmed.contains("Error") {
                violations.push((relative.clone(), i + 1, trimmed.to_string()));
            }
        }
    }
    report(
        "AIGW-ERR-01",
        "Hand-written Display for an error type. Use #[derive(thiserror::Error)] instead.",
        &violations,
    );
}

#[test]
fn test_no_result_string_in_core() {
    let root = workspace_root();
    let core_src = root.join("crates/aigw-core/src");

    let mut violations = Vec::new();
    for file in collect_rs_files(&core_src) {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        let relative = rel(&file, &root);
        for (i, line) in non_test_code(&content).lines().enumerate() {
            let trimmed = line.trim();
            if is_comment(trimmed) {
                continue;
            }
            if let Some(pos) = trimmed.find("Result<") {
                let after = &trimmed[pos..];
                if after.contains(", String>") || after.contains(",String>") {
                    violations.push((relative.clone(), i + 1, trimmed.to_string()));
                }
            }
        }
    }
    report(
        "AIGW-ERR-02",
        "Result<_, String> in aigw-core. Use GatewayResult or a typed failure.",
        &violations,
    );
}

#[test]
fn test_adapters_are_registered() {
    let root = workspace_root();
    let providers_dir = root.join("crates/aigw-core/src/providers");
    let set_content = fs::read_to_string(providers_dir.join("set.rs")).unwrap_or_default();
    let defaults = set_content
        .split("pub fn with_defaults")
        .nth(1)
        .and_then(|rest| rest.split("\n    }").next())
        .unwrap_or_default();

    let mut violations = Vec::new();
    for file in collect_rs_files(&providers_dir) {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        let relative = rel(&file, &root);
        for (i, line) in content.lines().enumerate() {
            let Some(name) = line.trim().strip_prefix("impl ProviderAdapter for ") else {
                continue;
            };
            let name = name.trim_end_matches(" {").trim();
            if !content.contains("async fn invoke(") || !content.contains("async fn ping(") {
                violations.push((relative.clone(), i + 1, format!("{name} must implement invoke and ping")));
            }
            if !defaults.contains(&format!("{name}::new")) {
                violations.push((relative.clone(), i + 1, format!("{name} missing from AdapterSet::with_defaults")));
            }
        }
    }
    report(
        "AIGW-PROV-01",
        "Provider adapter is incomplete or not wired into the default adapter set.",
        &violations,
    );
}

#[test]
fn test_core_does_not_print() {
    let root = workspace_root();
    let core_src = root.join("crates/aigw-core/src");

    let mut violations = Vec::new();
    for file in collect_rs_files(&core_src) {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        let relative = rel(&file, &root);
        for (i, line) in non_test_code(&content).lines().enumerate() {
            let trimmed = line.trim();
            if is_comment(trimmed) {
                continue;
            }
            if ["println!", "eprintln!", "print!(", "dbg!"].iter().any(|m| trimmed.contains(m)) {
                violations.push((relative.clone(), i + 1, trimmed.to_string()));
            }
        }
    }
    report(
        "AIGW-LOG-01",
        "Direct printing in aigw-core. Use tracing macros instead.",
        &violations,
    );
}

#[test]
fn test_file_size_limits() {
    const MAX_LINES: usize = 500;
    let root = workspace_root();

    let mut violations = Vec::new();
    for file in source_files(&root) {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        let count = content.lines().count();
        if count > MAX_LINES {
            violations.push((rel(&file, &root), count, format!("{count} lines")));
        }
    }
    report(
        "AIGW-SIZE-01",
        "Files exceeding 500 lines. Split into submodules.",
        &violations,
    );
}
