//! Source tree enumeration.
//!
//! Lists every regular file under the project root as a `/`-separated path
//! relative to it. Nothing is skipped here: hidden files, VCS metadata and
//! the staging directory are all reported, and exclusion is left to the
//! decision engine. Symlinks are not followed.

use std::path::Path;
use walkdir::WalkDir;

/// All regular files under `root`, relative and sorted.
pub fn walk_files(root: &Path) -> Result<Vec<String>, walkdir::Error> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            files.push(to_relative_string(rel));
        }
    }

    // Order is irrelevant to decisions; sorting keeps reports stable.
    files.sort();
    Ok(files)
}

/// Render a relative path with `/` separators on every platform.
pub fn to_relative_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
