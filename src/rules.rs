//! Rule sources and the reader that loads them.
//!
//! Every rule file kind is one row in a closed table: the filename it is read
//! from, whether it adds files to the package or removes them, and an
//! optional content transform. Only `.gitattributes` has a transform: it
//! keeps the paths carrying the `export-ignore` attribute and drops the rest.
//!
//! ## Where rule files come from
//!
//! The `paths.sync_files` config list names every rule file to consult. Root
//! files are plain names (`.distignore`); files deeper in the tree carry their
//! directory (`src/.distignore`). A subdirectory file's rules are rewritten to
//! be relative to the project root:
//!
//! ```text
//! src/.distignore          resolved as
//!   *.map                    src/*.map
//!   /legacy.php              /src/legacy.php
//!   !keep.php                !src/keep.php
//! ```
//!
//! The bundled default ignore list is compiled into the binary and is never
//! re-prefixed.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path};

/// Bundled default ignore rules.
pub const DEFAULT_IGNORE: &str = include_str!("../defaults/distignore-defaults");

/// Attribute that marks a path as excluded from exported archives.
const EXPORT_IGNORE: &str = "export-ignore";

/// A kind of rule file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSource {
    Distfiles,
    Distignore,
    Distinclude,
    GitAttributes,
    DefaultIgnore,
}

/// Whether a source's lines add files to the package or remove them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Allow,
    Deny,
}

/// One row of the source table.
#[derive(Debug)]
pub struct SourceRow {
    pub filename: &'static str,
    pub polarity: Polarity,
    pub transform: Option<fn(&str) -> String>,
}

const DISTFILES: SourceRow = SourceRow {
    filename: ".distfiles",
    polarity: Polarity::Allow,
    transform: None,
};

const DISTIGNORE: SourceRow = SourceRow {
    filename: ".distignore",
    polarity: Polarity::Deny,
    transform: None,
};

const DISTINCLUDE: SourceRow = SourceRow {
    filename: ".distinclude",
    polarity: Polarity::Allow,
    transform: None,
};

const GIT_ATTRIBUTES: SourceRow = SourceRow {
    filename: ".gitattributes",
    polarity: Polarity::Deny,
    transform: Some(export_ignore_paths),
};

const DEFAULT_IGNORE_ROW: SourceRow = SourceRow {
    filename: ".distignore-defaults",
    polarity: Polarity::Deny,
    transform: None,
};

impl RuleSource {
    pub const ALL: [RuleSource; 5] = [
        RuleSource::Distfiles,
        RuleSource::Distinclude,
        RuleSource::Distignore,
        RuleSource::GitAttributes,
        RuleSource::DefaultIgnore,
    ];

    pub fn row(self) -> &'static SourceRow {
        match self {
            RuleSource::Distfiles => &DISTFILES,
            RuleSource::Distignore => &DISTIGNORE,
            RuleSource::Distinclude => &DISTINCLUDE,
            RuleSource::GitAttributes => &GIT_ATTRIBUTES,
            RuleSource::DefaultIgnore => &DEFAULT_IGNORE_ROW,
        }
    }

    pub fn filename(self) -> &'static str {
        self.row().filename
    }

    pub fn polarity(self) -> Polarity {
        self.row().polarity
    }

    /// Whether a `sync_files` entry is a file of this kind.
    pub fn accepts(self, sync_file: &str) -> bool {
        basename(sync_file) == self.filename()
    }

    fn apply_transform(self, content: &str) -> Cow<'_, str> {
        match self.row().transform {
            Some(transform) => Cow::Owned(transform(content)),
            None => Cow::Borrowed(content),
        }
    }
}

/// Read every pattern a source contributes.
///
/// Each `sync_files` entry of this kind is looked up under `root`, or
/// where it points when absolute. Missing files contribute nothing. Blank and
/// `#` lines are dropped from the result.
pub fn read_source(
    kind: RuleSource,
    sync_files: &[String],
    root: &Path,
) -> io::Result<Vec<String>> {
    let mut raw = String::new();

    if kind == RuleSource::DefaultIgnore {
        raw.push_str(DEFAULT_IGNORE);
        raw.push('\n');
    }

    for name in sync_files.iter().filter(|name| kind.accepts(name)) {
        let Some(content) = load(root, name)? else {
            tracing::debug!(source = kind.filename(), file = %name, "rule file not present");
            continue;
        };
        let content = kind.apply_transform(&content);

        match subdirectory(name) {
            Some(dir) if kind != RuleSource::DefaultIgnore => {
                for line in relocate(&content, &dir) {
                    raw.push_str(&line);
                    raw.push('\n');
                }
            }
            _ => {
                raw.push_str(&content);
                raw.push('\n');
            }
        }
        tracing::debug!(source = kind.filename(), file = %name, "read rule file");
    }

    Ok(pattern_lines(&raw))
}

/// Split raw rule text into pattern lines.
pub fn pattern_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Keep the path of every `.gitattributes` line that sets `export-ignore`.
pub fn export_ignore_paths(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let path = tokens.next()?;
            tokens.any(|attr| attr == EXPORT_IGNORE).then_some(path)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn load(root: &Path, name: &str) -> io::Result<Option<String>> {
    // `join` keeps an absolute entry as given.
    match fs::read_to_string(root.join(name)) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// The directory part of a relative `sync_files` entry, `/`-separated.
fn subdirectory(name: &str) -> Option<String> {
    let path = Path::new(name);
    if path.is_absolute() || name.starts_with('/') {
        return None;
    }
    // `./.distignore` and `src/./.distignore` normalize like `zip_dir` does.
    let dir = path
        .parent()?
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    (!dir.is_empty()).then_some(dir)
}

/// Rewrite a subdirectory rule file's lines to be root-relative.
fn relocate(content: &str, dir: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    pattern_lines(content)
        .into_iter()
        .map(|line| {
            let (negation, pattern) = match line.strip_prefix('!') {
                Some(rest) => ("!", rest),
                None => ("", line.as_str()),
            };
            if pattern.starts_with('/') {
                format!("{negation}/{dir}{pattern}")
            } else {
                format!("{negation}{dir}/{pattern}")
            }
        })
        .filter(|line| seen.insert(line.clone()))
        .collect()
}

fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn sync_files() -> Vec<String> {
        default_sync_files()
    }

    #[test]
    fn table_rows_have_canonical_filenames() {
        assert_eq!(RuleSource::Distfiles.filename(), ".distfiles");
        assert_eq!(RuleSource::Distignore.filename(), ".distignore");
        assert_eq!(RuleSource::Distinclude.filename(), ".distinclude");
        assert_eq!(RuleSource::GitAttributes.filename(), ".gitattributes");
    }

    #[test]
    fn polarity_per_source() {
        assert_eq!(RuleSource::Distfiles.polarity(), Polarity::Allow);
        assert_eq!(RuleSource::Distinclude.polarity(), Polarity::Allow);
        assert_eq!(RuleSource::Distignore.polarity(), Polarity::Deny);
        assert_eq!(RuleSource::GitAttributes.polarity(), Polarity::Deny);
        assert_eq!(RuleSource::DefaultIgnore.polarity(), Polarity::Deny);
    }

    #[test]
    fn only_gitattributes_transforms() {
        for kind in RuleSource::ALL {
            assert_eq!(
                kind.row().transform.is_some(),
                kind == RuleSource::GitAttributes,
                "{kind:?}"
            );
        }
    }

    #[test]
    fn missing_file_yields_no_patterns() {
        let tmp = project(&[]);
        let lines = read_source(RuleSource::Distignore, &sync_files(), tmp.path()).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn root_file_is_read_verbatim_without_comments_or_blanks() {
        let tmp = project(&[(".distignore", "# build output\n\n*.map\n  /dev  \n")]);
        let lines = read_source(RuleSource::Distignore, &sync_files(), tmp.path()).unwrap();
        assert_eq!(lines, vec!["*.map", "/dev"]);
    }

    #[test]
    fn only_entries_of_the_requested_kind_are_read() {
        let tmp = project(&[(".distignore", "a\n"), (".distinclude", "b\n")]);
        let lines = read_source(RuleSource::Distinclude, &sync_files(), tmp.path()).unwrap();
        assert_eq!(lines, vec!["b"]);
    }

    #[test]
    fn subdirectory_file_is_prefixed_and_deduplicated() {
        let tmp = project(&[(
            "src/.distignore",
            "# comment\n*.map\n/legacy.php\n!keep.php\n*.map\n",
        )]);
        let files = vec!["src/.distignore".to_string()];
        let lines = read_source(RuleSource::Distignore, &files, tmp.path()).unwrap();
        assert_eq!(lines, vec!["src/*.map", "/src/legacy.php", "!src/keep.php"]);
    }

    #[test]
    fn nested_subdirectory_prefix_uses_forward_slashes() {
        let tmp = project(&[("a/b/.distinclude", "x.php\n")]);
        let files = vec!["a/b/.distinclude".to_string()];
        let lines = read_source(RuleSource::Distinclude, &files, tmp.path()).unwrap();
        assert_eq!(lines, vec!["a/b/x.php"]);
    }

    #[test]
    fn dot_prefixed_entry_is_a_root_file() {
        let tmp = project(&[(".distignore", "secret.php\n/build\n")]);
        let files = vec!["./.distignore".to_string()];
        let lines = read_source(RuleSource::Distignore, &files, tmp.path()).unwrap();
        assert_eq!(lines, vec!["secret.php", "/build"]);
    }

    #[test]
    fn dot_segments_are_dropped_from_subdirectory_prefix() {
        let tmp = project(&[("src/.distignore", "*.map\n")]);
        let files = vec!["./src/./.distignore".to_string()];
        let lines = read_source(RuleSource::Distignore, &files, tmp.path()).unwrap();
        assert_eq!(lines, vec!["src/*.map"]);
    }

    #[test]
    fn root_and_subdirectory_files_accumulate() {
        let tmp = project(&[(".distignore", "*.log\n"), ("lib/.distignore", "*.log\n")]);
        let files = vec![".distignore".to_string(), "lib/.distignore".to_string()];
        let lines = read_source(RuleSource::Distignore, &files, tmp.path()).unwrap();
        assert_eq!(lines, vec!["*.log", "lib/*.log"]);
    }

    #[test]
    fn absolute_entry_is_read_where_it_points() {
        let elsewhere = project(&[("shared.distignore/.distignore", "*.bak\n")]);
        let absolute = elsewhere
            .path()
            .join("shared.distignore/.distignore")
            .to_string_lossy()
            .to_string();
        let root = project(&[]);
        let lines = read_source(RuleSource::Distignore, &[absolute], root.path()).unwrap();
        // Absolute entries are not relocated.
        assert_eq!(lines, vec!["*.bak"]);
    }

    #[test]
    fn gitattributes_keeps_only_export_ignore_paths() {
        let tmp = project(&[(
            ".gitattributes",
            "* text=auto\n/tests export-ignore\nsrc/ export-ignore\n# /docs export-ignore\n*.png binary\n/.github  export-ignore linguist-vendored\n",
        )]);
        let lines = read_source(RuleSource::GitAttributes, &sync_files(), tmp.path()).unwrap();
        assert_eq!(lines, vec!["/tests", "src/", "/.github"]);
    }

    #[test]
    fn gitattributes_ignores_unset_attribute() {
        assert_eq!(export_ignore_paths("docs -export-ignore\n"), "");
    }

    #[test]
    fn subdirectory_gitattributes_is_transformed_then_prefixed() {
        let tmp = project(&[("vendor/pkg/.gitattributes", "/tests export-ignore\n")]);
        let files = vec!["vendor/pkg/.gitattributes".to_string()];
        let lines = read_source(RuleSource::GitAttributes, &files, tmp.path()).unwrap();
        assert_eq!(lines, vec!["/vendor/pkg/tests"]);
    }

    #[test]
    fn default_ignore_reads_bundled_list() {
        let tmp = project(&[]);
        let lines = read_source(RuleSource::DefaultIgnore, &[], tmp.path()).unwrap();
        assert!(lines.contains(&".git".to_string()));
        assert!(lines.contains(&".puprc".to_string()));
        assert!(lines.contains(&"node_modules".to_string()));
        assert!(lines.iter().all(|l| !l.starts_with('#')));
    }

    #[test]
    fn rereading_unchanged_files_is_stable() {
        let tmp = project(&[(".distignore", "a\nb\n"), ("x/.distignore", "c\n")]);
        let files = vec![".distignore".to_string(), "x/.distignore".to_string()];
        let first = read_source(RuleSource::Distignore, &files, tmp.path()).unwrap();
        let second = read_source(RuleSource::Distignore, &files, tmp.path()).unwrap();
        assert_eq!(first, second);
    }
}
