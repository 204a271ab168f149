//! Shared test utilities for the pup test suite.
//!
//! Builds throwaway project trees and lists what ended up where.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = project(&[
//!     ("bootstrap.php", "<?php"),
//!     ("src/Plugin.php", "<?php"),
//!     (".distignore", "src/\n"),
//! ]);
//! let result = stage(tmp.path(), &PupConfig::default()).unwrap();
//! assert_eq!(staged_entries(&result.staging_dir).unwrap(), vec!["bootstrap.php"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::config::PupConfig;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create a temp project containing `files`, given as `(relative path, contents)`.
///
/// Parent directories are created as needed.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (rel, contents) in files {
        let path = tmp.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
    }
    tmp
}

/// The stock `paths.sync_files` list.
pub fn default_sync_files() -> Vec<String> {
    PupConfig::default().paths.sync_files
}

// =========================================================================
// Inspection
// =========================================================================

/// Every regular file under `dir`, relative and sorted.
pub fn files_under(dir: &Path) -> Vec<String> {
    crate::walk::walk_files(dir).unwrap()
}
