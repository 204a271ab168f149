//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Rules
//!     allow: src/
//!     deny:  .puprc
//!     deny:  *.log
//!
//! Included
//!     bootstrap.php
//!     src/Plugin.php
//!
//! Excluded
//!     debug.log (denied by *.log)
//!     readme.md (not in allowlist)
//!
//! 2 included, 2 excluded
//! ```
//!
//! `Rules` and `Excluded` sections are only shown in verbose mode.
//!
//! ## Package
//!
//! ```text
//! Staged 2 files (1.2 KB) into .pup-zip
//! Archive: my-plugin.1.0.0.zip
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::decision::Decision;
use crate::package::{CheckResult, PackageResult};
use crate::resolve::ResolvedRuleSet;
use crate::sync::SyncReport;
use std::path::Path;

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

fn exclusion_reason(decision: &Decision) -> String {
    match decision {
        Decision::Included => "included".to_string(),
        Decision::NotAllowlisted => "not in allowlist".to_string(),
        Decision::Denied { pattern } => format!("denied by {}", pattern),
    }
}

// ============================================================================
// Rules
// ============================================================================

fn format_rules(rules: &ResolvedRuleSet) -> Vec<String> {
    let mut lines = vec!["Rules".to_string()];
    if rules.from_distfiles() {
        lines.push(format!("{}(.distfiles present, ignore files skipped)", indent(1)));
    }
    for pattern in rules.allowlist() {
        lines.push(format!("{}allow: {}", indent(1), pattern));
    }
    for pattern in rules.denylist() {
        lines.push(format!("{}deny:  {}", indent(1), pattern));
    }
    lines
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(result: &CheckResult, verbose: bool) -> Vec<String> {
    let mut lines = Vec::new();

    if verbose {
        lines.extend(format_rules(&result.rules));
        lines.push(String::new());
    }

    lines.extend(format_report(&result.report, verbose));
    lines
}

fn format_report(report: &SyncReport, verbose: bool) -> Vec<String> {
    let mut lines = vec!["Included".to_string()];
    for path in &report.included {
        lines.push(format!("{}{}", indent(1), path));
    }

    if verbose && !report.excluded.is_empty() {
        lines.push(String::new());
        lines.push("Excluded".to_string());
        for (path, decision) in &report.excluded {
            lines.push(format!(
                "{}{} ({})",
                indent(1),
                path,
                exclusion_reason(decision)
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{} included, {} excluded",
        report.included.len(),
        report.excluded.len()
    ));
    lines
}

pub fn print_check_output(result: &CheckResult, verbose: bool) {
    for line in format_check_output(result, verbose) {
        println!("{}", line);
    }
}

// ============================================================================
// Package
// ============================================================================

pub fn format_package_output(result: &PackageResult, root: &Path) -> Vec<String> {
    let report = &result.stage.report;
    let display = |path: &Path| {
        path.strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string()
    };
    vec![
        format!(
            "Staged {} ({}) into {}",
            plural(report.included.len(), "file"),
            format_bytes(report.bytes),
            display(&result.stage.staging_dir)
        ),
        format!("Archive: {}", display(&result.archive)),
    ]
}

pub fn print_package_output(result: &PackageResult, root: &Path) {
    for line in format_package_output(result, root) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glob::Pattern;
    use crate::package::StageResult;
    use std::path::PathBuf;

    fn sample_check() -> CheckResult {
        CheckResult {
            rules: ResolvedRuleSet::new(vec![Pattern::new("src/")], vec![Pattern::new("*.log")]),
            report: SyncReport {
                included: vec!["src/Plugin.php".into()],
                excluded: vec![
                    (
                        "debug.log".into(),
                        Decision::Denied {
                            pattern: "*.log".into(),
                        },
                    ),
                    ("readme.md".into(), Decision::NotAllowlisted),
                ],
                bytes: 0,
            },
        }
    }

    #[test]
    fn check_output_quiet() {
        let lines = format_check_output(&sample_check(), false);
        assert_eq!(
            lines,
            vec!["Included", "    src/Plugin.php", "", "1 included, 2 excluded"]
        );
    }

    #[test]
    fn check_output_verbose_shows_rules_and_reasons() {
        let lines = format_check_output(&sample_check(), true);
        assert_eq!(lines[0], "Rules");
        assert!(lines.contains(&"    allow: src/".to_string()));
        assert!(lines.contains(&"    deny:  *.log".to_string()));
        assert!(lines.contains(&"    debug.log (denied by *.log)".to_string()));
        assert!(lines.contains(&"    readme.md (not in allowlist)".to_string()));
    }

    #[test]
    fn package_output_uses_root_relative_paths() {
        let root = PathBuf::from("/work/my-plugin");
        let result = PackageResult {
            stage: StageResult {
                staging_dir: root.join(".pup-zip"),
                rules: ResolvedRuleSet::default(),
                report: SyncReport {
                    included: vec!["a.php".into(), "b.php".into()],
                    excluded: vec![],
                    bytes: 2048,
                },
            },
            archive: root.join("my-plugin.1.0.0.zip"),
        };
        assert_eq!(
            format_package_output(&result, &root),
            vec![
                "Staged 2 files (2.0 KB) into .pup-zip",
                "Archive: my-plugin.1.0.0.zip"
            ]
        );
    }

    #[test]
    fn bytes_formatting() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
