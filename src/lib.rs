//! # pup
//!
//! Packages a project directory into a distributable archive. Rule files in
//! the project decide which files ship; everything else stays behind.
//!
//! # Architecture: Resolve, Decide, Copy
//!
//! ```text
//! 1. Resolve   rule files  →  ResolvedRuleSet   (allowlist + denylist)
//! 2. Decide    every file  →  Decision          (pure, order independent)
//! 3. Copy      accepted    →  <zip_dir>/        (then zipped by an Archiver)
//! ```
//!
//! Resolution happens once per run and the result is read-only afterwards,
//! so decisions and copies fan out across threads with rayon.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`glob`] | Extended glob patterns compiled to anchored regexes |
//! | [`rules`] | Reading `.distfiles`, `.distignore`, `.distinclude`, `.gitattributes` and the bundled defaults |
//! | [`resolve`] | Folding all rule sources into one allow/deny rule set |
//! | [`decision`] | Per-path allow gate and deny veto |
//! | [`walk`] | Enumerating regular files under the project root |
//! | [`sync`] | Parallel copy of accepted files into the staging directory |
//! | [`package`] | End-to-end stage/check/package runs and the `Archiver` seam |
//! | [`config`] | `.puprc` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Rule Files
//!
//! ```text
//! project/
//! ├── .puprc           # Tool config (JSON, optional)
//! ├── .distfiles       # Allowlist. When present, only matching files ship
//! ├── .distinclude     # Extra allowlist entries
//! ├── .distignore      # Denylist
//! ├── .gitattributes   # `path export-ignore` lines join the denylist
//! └── src/.distignore  # Scoped to src/ when listed in paths.sync_files
//! ```
//!
//! A deny always beats an allow. A `!pattern` line flips to the other list.

pub mod config;
pub mod decision;
pub mod glob;
pub mod output;
pub mod package;
pub mod resolve;
pub mod rules;
pub mod sync;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
