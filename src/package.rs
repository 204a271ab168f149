//! End-to-end packaging runs.
//!
//! ```text
//! resolve rules → walk root → clear <zip_dir> → sync into <zip_dir> → archive
//! ```
//!
//! Archiving sits behind the [`Archiver`] trait. The production
//! implementation, [`ZipCommand`], shells out to the system `zip` binary so
//! the archive has the same layout any other tool would produce from the
//! staging directory. Tests substitute a recording mock.
//!
//! ## Staging marker
//!
//! pup owns its staging directory through a [`STAGING_MARKER`] file written
//! when the directory is created. It reads `incomplete` while files are being
//! copied and `complete` once the sync succeeded. An existing non-empty
//! directory without the marker is never cleared, so a `zip_dir` pointing at
//! project content fails instead of deleting it. The marker is not part of
//! the package.

use crate::config::{ConfigError, PupConfig};
use crate::resolve::{ResolvedRuleSet, RulesError, resolve};
use crate::sync::{SyncError, SyncReport, plan, sync_files};
use crate::walk::walk_files;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// File inside the staging directory that marks it as pup's.
pub const STAGING_MARKER: &str = ".pup-staging";

const MARKER_INCOMPLETE: &str = "incomplete\n";
const MARKER_COMPLETE: &str = "complete\n";

/// A zip archive with no entries: just the end of central directory record.
const EMPTY_ZIP: [u8; 22] = [
    0x50, 0x4b, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Refusing to clear {0}: it is not empty and was not created by pup")]
    ForeignStagingDir(PathBuf),
    #[error("Staging directory {0} is incomplete")]
    IncompleteStaging(PathBuf),
    #[error("Archive failed: {0}")]
    Archive(String),
}

/// Turns a staged directory into a single archive file.
pub trait Archiver: Sync {
    /// Archive the contents of `staging` (not the directory itself) into
    /// `destination`, replacing it if present. [`STAGING_MARKER`] is left out.
    fn archive(&self, staging: &Path, destination: &Path) -> Result<(), PackageError>;
}

/// Archiver backed by the `zip` command line tool.
#[derive(Debug, Clone)]
pub struct ZipCommand {
    program: String,
}

impl Default for ZipCommand {
    fn default() -> Self {
        Self {
            program: "zip".to_string(),
        }
    }
}

impl ZipCommand {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Archiver for ZipCommand {
    fn archive(&self, staging: &Path, destination: &Path) -> Result<(), PackageError> {
        // zip runs inside the staging dir, so the target must not be relative.
        let destination = std::path::absolute(destination)?;
        if destination.exists() {
            fs::remove_file(&destination)?;
        }

        let entries = staged_entries(staging)?;
        if entries.is_empty() {
            // zip refuses to create an archive with nothing in it.
            tracing::info!(archive = %destination.display(), "nothing staged, writing empty archive");
            fs::write(&destination, EMPTY_ZIP)?;
            return Ok(());
        }

        let mut child = Command::new(&self.program)
            .args(["-q", "-@"])
            .arg(&destination)
            .current_dir(staging)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PackageError::Archive(format!("failed to run {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let mut list = entries.join("\n");
            list.push('\n');
            stdin.write_all(list.as_bytes())?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(PackageError::Archive(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Files in a staging directory that belong in the archive.
pub fn staged_entries(staging: &Path) -> Result<Vec<String>, PackageError> {
    let mut entries = walk_files(staging).map_err(SyncError::from)?;
    entries.retain(|entry| entry != STAGING_MARKER);
    Ok(entries)
}

/// Whether `staging` holds a finished sync.
pub fn is_complete(staging: &Path) -> bool {
    fs::read_to_string(staging.join(STAGING_MARKER))
        .map(|state| state == MARKER_COMPLETE)
        .unwrap_or(false)
}

/// Result of a staging run.
#[derive(Debug)]
pub struct StageResult {
    pub staging_dir: PathBuf,
    pub rules: ResolvedRuleSet,
    pub report: SyncReport,
}

/// Result of a full packaging run.
#[derive(Debug)]
pub struct PackageResult {
    pub stage: StageResult,
    pub archive: PathBuf,
}

/// Result of a dry run.
#[derive(Debug)]
pub struct CheckResult {
    pub rules: ResolvedRuleSet,
    pub report: SyncReport,
}

/// Absolute staging directory for the project at `root`.
pub fn staging_dir(root: &Path, config: &PupConfig) -> PathBuf {
    root.join(config.zip_dir_relative())
}

/// Archive file name for a given version.
pub fn archive_name(root: &Path, config: &PupConfig, version: &str) -> String {
    format!("{}.{}.zip", config.zip_name_for(root), version)
}

/// Decide every file without copying anything.
pub fn check(root: &Path, config: &PupConfig) -> Result<CheckResult, PackageError> {
    let rules = resolve(config, root)?;
    let candidates = walk_files(root).map_err(SyncError::from)?;
    let report = plan(&candidates, &rules);
    tracing::info!(
        included = report.included.len(),
        excluded = report.excluded.len(),
        "checked project"
    );
    Ok(CheckResult { rules, report })
}

/// Rebuild the staging directory from scratch.
///
/// Rules are resolved before anything is removed, so a broken rule file
/// leaves a previous staging dir untouched. A failed copy removes the
/// partial staging dir.
pub fn stage(root: &Path, config: &PupConfig) -> Result<StageResult, PackageError> {
    let candidates = walk_files(root).map_err(SyncError::from)?;
    stage_candidates(root, config, &candidates)
}

fn stage_candidates(
    root: &Path,
    config: &PupConfig,
    candidates: &[String],
) -> Result<StageResult, PackageError> {
    let rules = resolve(config, root)?;
    let staging_dir = staging_dir(root, config);
    prepare_staging_dir(&staging_dir)?;

    let report = match sync_files(root, &staging_dir, candidates, &rules) {
        Ok(report) => report,
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&staging_dir) {
                tracing::warn!(error = %cleanup, "failed to remove partial staging directory");
            }
            return Err(e.into());
        }
    };
    fs::write(staging_dir.join(STAGING_MARKER), MARKER_COMPLETE)?;

    Ok(StageResult {
        staging_dir,
        rules,
        report,
    })
}

/// Clear a previous staging dir and recreate it, marked incomplete.
fn prepare_staging_dir(dir: &Path) -> Result<(), PackageError> {
    if dir.exists() {
        let owned = dir.join(STAGING_MARKER).is_file();
        if !owned && fs::read_dir(dir)?.next().is_some() {
            return Err(PackageError::ForeignStagingDir(dir.to_path_buf()));
        }
        tracing::debug!(dir = %dir.display(), "clearing staging directory");
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    fs::write(dir.join(STAGING_MARKER), MARKER_INCOMPLETE)?;
    Ok(())
}

/// Stage the project and archive it as `<zip_name>.<version>.zip` in `root`.
pub fn package(
    root: &Path,
    config: &PupConfig,
    version: &str,
    archiver: &dyn Archiver,
) -> Result<PackageResult, PackageError> {
    validate_version(version)?;
    let candidates = walk_files(root).map_err(SyncError::from)?;
    package_candidates(root, config, version, archiver, &candidates)
}

fn package_candidates(
    root: &Path,
    config: &PupConfig,
    version: &str,
    archiver: &dyn Archiver,
    candidates: &[String],
) -> Result<PackageResult, PackageError> {
    let stage = stage_candidates(root, config, candidates)?;
    if !is_complete(&stage.staging_dir) {
        return Err(PackageError::IncompleteStaging(stage.staging_dir));
    }
    let archive = root.join(archive_name(root, config, version));

    archiver.archive(&stage.staging_dir, &archive)?;
    tracing::info!(archive = %archive.display(), "wrote archive");

    Ok(PackageResult { stage, archive })
}

fn validate_version(version: &str) -> Result<(), PackageError> {
    if version.trim().is_empty() || version.contains(['/', '\\']) {
        return Err(PackageError::Archive(format!(
            "invalid version {:?}",
            version
        )));
    }
    Ok(())
}
