//! Per-file inclusion decisions.
//!
//! A decision is a pure function of a relative path and the resolved rule
//! set: an allow gate followed by a deny veto.
//!
//! 1. If the allowlist is non-empty, the path must match one of its patterns.
//! 2. If the path matches any denylist pattern, it is excluded.
//! 3. Otherwise it ships.
//!
//! A deny rule therefore always beats an include rule for the same path.

use crate::glob::Pattern;
use crate::resolve::ResolvedRuleSet;

/// Outcome for one candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Included,
    /// An allowlist exists and no entry matched.
    NotAllowlisted,
    /// The first denylist entry that matched.
    Denied { pattern: String },
}

impl Decision {
    pub fn is_included(&self) -> bool {
        matches!(self, Decision::Included)
    }
}

/// Decide whether `relative_path` ships.
pub fn decide(relative_path: &str, rules: &ResolvedRuleSet) -> Decision {
    decide_with(relative_path, rules, |pattern, path| pattern.matches(path))
}

/// Like [`decide`], with a caller-supplied match function.
pub fn decide_with<F>(relative_path: &str, rules: &ResolvedRuleSet, matches: F) -> Decision
where
    F: Fn(&Pattern, &str) -> bool,
{
    if rules.restricts()
        && !rules
            .allowlist()
            .iter()
            .any(|pattern| matches(pattern, relative_path))
    {
        return Decision::NotAllowlisted;
    }

    match rules
        .denylist()
        .iter()
        .find(|pattern| matches(pattern, relative_path))
    {
        Some(pattern) => Decision::Denied {
            pattern: pattern.as_str().to_string(),
        },
        None => Decision::Included,
    }
}

pub fn should_include(relative_path: &str, rules: &ResolvedRuleSet) -> bool {
    decide(relative_path, rules).is_included()
}

pub fn should_include_with<F>(relative_path: &str, rules: &ResolvedRuleSet, matches: F) -> bool
where
    F: Fn(&Pattern, &str) -> bool,
{
    decide_with(relative_path, rules, matches).is_included()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn patterns(raw: &[&str]) -> Vec<Pattern> {
        raw.iter().map(|p| Pattern::new(*p)).collect()
    }

    fn rules(allow: &[&str], deny: &[&str]) -> ResolvedRuleSet {
        ResolvedRuleSet::new(patterns(allow), patterns(deny))
    }

    #[test]
    fn no_rules_includes_everything() {
        let rules = rules(&[], &[]);
        assert!(should_include("bootstrap.php", &rules));
        assert!(should_include("src/deep/file.txt", &rules));
    }

    #[test]
    fn denylist_excludes_matches() {
        let rules = rules(&[], &["other-file.php"]);
        assert!(should_include("bootstrap.php", &rules));
        assert_eq!(
            decide("other-file.php", &rules),
            Decision::Denied {
                pattern: "other-file.php".into()
            }
        );
    }

    #[test]
    fn allowlist_gates_unmatched_paths() {
        let rules = rules(&["bootstrap.php"], &[]);
        assert!(should_include("bootstrap.php", &rules));
        assert_eq!(decide("src/Plugin.php", &rules), Decision::NotAllowlisted);
    }

    #[test]
    fn deny_beats_allow_for_same_path() {
        let rules = rules(&["bootstrap.php"], &["*.php"]);
        assert_eq!(
            decide("bootstrap.php", &rules),
            Decision::Denied {
                pattern: "*.php".into()
            }
        );
    }

    #[test]
    fn first_matching_deny_is_reported() {
        let rules = rules(&[], &["src/", "*.php"]);
        assert_eq!(
            decide("src/Plugin.php", &rules),
            Decision::Denied {
                pattern: "src/".into()
            }
        );
    }

    #[test]
    fn allow_gate_short_circuits_deny_checks() {
        let rules = rules(&["*.md"], &["a", "b", "c"]);
        let calls = AtomicUsize::new(0);
        let included = should_include_with("x.php", &rules, |pattern, path| {
            calls.fetch_add(1, Ordering::Relaxed);
            pattern.matches(path)
        });
        assert!(!included);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn custom_match_function_is_used() {
        let rules = rules(&[], &["anything"]);
        assert!(!should_include_with("whatever", &rules, |_, _| true));
        assert!(should_include_with("anything", &rules, |_, _| false));
    }

    #[test]
    fn decisions_do_not_depend_on_evaluation_order() {
        let rules = rules(&["src/", "bootstrap.php"], &["*.map"]);
        let paths = ["src/a.js", "src/a.js.map", "bootstrap.php", "readme.txt"];
        let forward: Vec<_> = paths.iter().map(|p| decide(p, &rules)).collect();
        let mut backward: Vec<_> = paths.iter().rev().map(|p| decide(p, &rules)).collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }
}
