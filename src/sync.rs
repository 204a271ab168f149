//! Copying accepted files into the staging directory.
//!
//! Decisions are pure, so both the per-file decision and the copy run in
//! parallel with [rayon](https://docs.rs/rayon) over a shared read-only
//! [`ResolvedRuleSet`]. Any failed copy aborts the whole sync: a partially
//! staged tree is never reported as a success.

use crate::decision::{Decision, decide};
use crate::resolve::ResolvedRuleSet;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to copy {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a sync did, or would do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Paths that ship, in candidate order.
    pub included: Vec<String>,
    /// Paths that do not ship, with the reason.
    pub excluded: Vec<(String, Decision)>,
    /// Bytes copied. Zero for a plan.
    pub bytes: u64,
}

/// Decide every candidate without touching the filesystem.
pub fn plan(candidates: &[String], rules: &ResolvedRuleSet) -> SyncReport {
    let decisions: Vec<(String, Decision)> = candidates
        .par_iter()
        .map(|path| (path.clone(), decide(path, rules)))
        .collect();

    let mut report = SyncReport::default();
    for (path, decision) in decisions {
        tracing::trace!(path = %path, ?decision, "decided");
        if decision.is_included() {
            report.included.push(path);
        } else {
            report.excluded.push((path, decision));
        }
    }
    report
}

/// Copy every included candidate from `root` into `dest`, preserving
/// relative structure.
pub fn sync_files(
    root: &Path,
    dest: &Path,
    candidates: &[String],
    rules: &ResolvedRuleSet,
) -> Result<SyncReport, SyncError> {
    let mut report = plan(candidates, rules);

    fs::create_dir_all(dest)?;
    let sizes: Vec<u64> = report
        .included
        .par_iter()
        .map(|rel| copy_file(&root.join(rel), &dest.join(rel)))
        .collect::<Result<_, _>>()?;
    report.bytes = sizes.iter().sum();

    tracing::info!(
        included = report.included.len(),
        excluded = report.excluded.len(),
        bytes = report.bytes,
        dest = %dest.display(),
        "synced files"
    );
    Ok(report)
}

fn copy_file(source: &Path, target: &Path) -> Result<u64, SyncError> {
    let copy_error = |source: io::Error| SyncError::Copy {
        path: target.to_path_buf(),
        source,
    };
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(copy_error)?;
    }
    fs::copy(source, target).map_err(copy_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glob::Pattern;
    use crate::test_helpers::*;

    fn deny(raw: &[&str]) -> ResolvedRuleSet {
        ResolvedRuleSet::new(vec![], raw.iter().map(|p| Pattern::new(*p)).collect())
    }

    #[test]
    fn plan_splits_candidates() {
        let candidates = vec!["a.php".to_string(), "b.log".to_string()];
        let report = plan(&candidates, &deny(&["*.log"]));
        assert_eq!(report.included, vec!["a.php"]);
        assert_eq!(
            report.excluded,
            vec![(
                "b.log".to_string(),
                Decision::Denied {
                    pattern: "*.log".into()
                }
            )]
        );
        assert_eq!(report.bytes, 0);
    }

    #[test]
    fn copies_included_files_byte_for_byte() {
        let src = project(&[
            ("bootstrap.php", "<?php // boot"),
            ("src/Plugin.php", "<?php class Plugin {}"),
            ("debug.log", "noise"),
        ]);
        let dest = project(&[]);
        let candidates = crate::walk::walk_files(src.path()).unwrap();

        let report = sync_files(src.path(), dest.path(), &candidates, &deny(&["*.log"])).unwrap();

        assert_eq!(files_under(dest.path()), vec!["bootstrap.php", "src/Plugin.php"]);
        assert_eq!(
            fs::read(dest.path().join("src/Plugin.php")).unwrap(),
            b"<?php class Plugin {}"
        );
        assert_eq!(report.bytes, 13 + 21);
    }

    #[test]
    fn creates_missing_destination() {
        let src = project(&[("a.txt", "a")]);
        let dest = project(&[]);
        let staging = dest.path().join("nested/staging");
        sync_files(src.path(), &staging, &["a.txt".to_string()], &deny(&[])).unwrap();
        assert!(staging.join("a.txt").is_file());
    }

    #[test]
    fn missing_source_aborts() {
        let src = project(&[]);
        let dest = project(&[]);
        let err = sync_files(src.path(), dest.path(), &["gone.txt".to_string()], &deny(&[]))
            .unwrap_err();
        assert!(matches!(err, SyncError::Copy { .. }));
    }
}
