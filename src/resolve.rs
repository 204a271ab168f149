//! Rule-set resolution.
//!
//! Folds every rule source into the two lists the decision engine consults:
//! an allowlist (empty means "no restriction") and a denylist. Resolution runs
//! once per packaging run, before any file is evaluated, and the result is
//! never mutated afterwards.
//!
//! ## Algorithm
//!
//! ```text
//! allow = .distfiles + .distinclude
//! deny  = .puprc, .pup-*, <zip_dir>
//!         + .distignore + .gitattributes export-ignore + defaults   (no .distfiles only)
//! then  "!x" in allow moves to deny as "x", "!x" in deny moves to allow as "x"
//! ```
//!
//! A `.distfiles` allowlist is authoritative: when it yields any pattern,
//! `.distignore`, `.gitattributes` and the bundled defaults are not read at
//! all. Only the baseline entries (the tool's own files and staging
//! directory) are still denied.
//!
//! Negation migration happens exactly once, over the fully assembled lists.

use crate::config::PupConfig;
use crate::glob::Pattern;
use crate::rules::{RuleSource, read_source};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Failed to read {file} rules: {source}")]
    Read {
        file: &'static str,
        #[source]
        source: io::Error,
    },
}

/// The effective allow and deny lists for one packaging run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedRuleSet {
    allowlist: Vec<Pattern>,
    denylist: Vec<Pattern>,
    distfiles: bool,
}

impl ResolvedRuleSet {
    /// Build a rule set directly from pattern lists.
    pub fn new(allowlist: Vec<Pattern>, denylist: Vec<Pattern>) -> Self {
        Self {
            allowlist,
            denylist,
            distfiles: false,
        }
    }

    /// Allow patterns. Empty means every file passes the allow gate.
    pub fn allowlist(&self) -> &[Pattern] {
        &self.allowlist
    }

    pub fn denylist(&self) -> &[Pattern] {
        &self.denylist
    }

    /// Whether the allow gate applies at all.
    pub fn restricts(&self) -> bool {
        !self.allowlist.is_empty()
    }

    /// Whether a `.distfiles` allowlist switched off the ignore sources.
    pub fn from_distfiles(&self) -> bool {
        self.distfiles
    }
}

/// Resolve the rule set for the project at `root`.
pub fn resolve(config: &PupConfig, root: &Path) -> Result<ResolvedRuleSet, RulesError> {
    let sync_files = &config.paths.sync_files;
    let read = |kind: RuleSource| {
        read_source(kind, sync_files, root).map_err(|source| RulesError::Read {
            file: kind.filename(),
            source,
        })
    };

    let distfiles = read(RuleSource::Distfiles)?;
    let allowlist_mode = !distfiles.is_empty();
    let include_lines = read(RuleSource::Distinclude)?;

    let mut deny = baseline(&config.zip_dir_relative());
    if !allowlist_mode {
        let mut subtractive = vec![RuleSource::Distignore, RuleSource::GitAttributes];
        if config.zip_use_default_ignore {
            subtractive.push(RuleSource::DefaultIgnore);
        }
        for kind in subtractive {
            deny.extend(read(kind)?.into_iter().map(Pattern::new));
        }
    }

    let include = distfiles
        .into_iter()
        .chain(include_lines)
        .map(Pattern::new)
        .collect();
    let (allowlist, denylist) = migrate_negations(include, deny);

    tracing::debug!(
        allow = allowlist.len(),
        deny = denylist.len(),
        distfiles = allowlist_mode,
        "resolved rule set"
    );

    Ok(ResolvedRuleSet {
        allowlist,
        denylist,
        distfiles: allowlist_mode,
    })
}

/// Entries that are denied no matter what the rule files say.
fn baseline(zip_dir: &str) -> Vec<Pattern> {
    vec![
        Pattern::new(".puprc"),
        Pattern::new(".pup-*"),
        Pattern::anchored(zip_dir),
    ]
}

/// Move `!`-prefixed entries to the opposite list, once.
fn migrate_negations(include: Vec<Pattern>, deny: Vec<Pattern>) -> (Vec<Pattern>, Vec<Pattern>) {
    let (negated_include, mut allow): (Vec<_>, Vec<_>) = include
        .into_iter()
        .partition(|p| p.as_str().starts_with('!'));
    let (negated_deny, mut denied): (Vec<_>, Vec<_>) = deny
        .into_iter()
        .partition(|p| p.as_str().starts_with('!'));

    allow.extend(strip_negation(negated_deny));
    denied.extend(strip_negation(negated_include));
    (allow, denied)
}

fn strip_negation(patterns: Vec<Pattern>) -> impl Iterator<Item = Pattern> {
    patterns.into_iter().filter_map(|p| {
        let stripped = p.as_str().strip_prefix('!').unwrap_or(p.as_str()).trim_start();
        (!stripped.is_empty()).then(|| Pattern::new(stripped))
    })
}
