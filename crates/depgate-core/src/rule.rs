//! Policy rules: matchers plus the effects they apply.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::candidate::{Candidate, UpdateType};
use crate::error::{PolicyError, Result};
use crate::schedule::ScheduleWindow;

/// Predicate set over [`Candidate`] fields.
///
/// All present matchers must hold for the rule to match (conjunction).
/// An absent (`None`) matcher means "match any". A present-but-empty
/// list is rejected at validation time: "match nothing" and "match any"
/// would be indistinguishable, so the caller must disambiguate by
/// omitting the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleMatchers {
    /// Update mechanisms this rule applies to (e.g. "cargo").
    pub managers: Option<Vec<String>>,

    /// Update types this rule applies to.
    pub update_types: Option<Vec<UpdateType>>,

    /// Source URL globs this rule applies to. `*` matches within a
    /// path segment, `**` matches across segments.
    pub source_urls: Option<Vec<String>>,
}

impl RuleMatchers {
    /// A matcher set that matches every candidate.
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to the given managers.
    pub fn with_managers(mut self, managers: Vec<String>) -> Self {
        self.managers = Some(managers);
        self
    }

    /// Restrict to the given update types.
    pub fn with_update_types(mut self, update_types: Vec<UpdateType>) -> Self {
        self.update_types = Some(update_types);
        self
    }

    /// Restrict to the given source URL globs.
    pub fn with_source_urls(mut self, source_urls: Vec<String>) -> Self {
        self.source_urls = Some(source_urls);
        self
    }

    /// Returns `true` if every present matcher accepts the candidate.
    pub fn matches(&self, candidate: &Candidate) -> bool {
        if let Some(managers) = &self.managers {
            if !managers.iter().any(|m| m == &candidate.manager) {
                return false;
            }
        }

        if let Some(update_types) = &self.update_types {
            if !update_types.contains(&candidate.update_type) {
                return false;
            }
        }

        if let Some(globs) = &self.source_urls {
            // A source-URL matcher against a candidate with no source
            // URL cannot hold.
            let Some(url) = &candidate.source_url else {
                return false;
            };
            if !globs.iter().any(|g| glob_matches(g, url)) {
                return false;
            }
        }

        true
    }
}

/// Compile a glob pattern to an anchored regex.
///
/// `**` matches any run of characters including `/`; `*` stops at `/`.
/// Everything else is escaped, so compilation only fails if the
/// translation itself is broken; [`Rule::validate`] surfaces that as
/// `InvalidRule` rather than letting it hide behind a non-match.
fn compile_glob(glob: &str) -> std::result::Result<Regex, regex::Error> {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');

    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    pattern.push_str(".*");
                } else {
                    pattern.push_str("[^/]*");
                }
            }
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern.push('$');

    Regex::new(&pattern)
}

fn glob_matches(glob: &str, input: &str) -> bool {
    match compile_glob(glob) {
        Ok(re) => re.is_match(input),
        Err(_) => {
            // Unreachable for validated rules: every translated pattern
            // is escaped, and validate() compiles each glob up front.
            debug_assert!(false, "glob '{glob}' failed to compile");
            false
        }
    }
}

/// Policy fields a matching rule sets.
///
/// Every field is optional; an unset field leaves whatever an earlier
/// rule (or the base policy) established.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleEffects {
    /// Merge the change automatically once eligible.
    pub automerge: Option<bool>,

    /// Delegate the merge to the hosting platform's queue.
    pub platform_automerge: Option<bool>,

    /// Labels to put on the change.
    pub add_labels: Option<Vec<String>>,

    /// Recurring windows during which the change may land.
    pub schedule: Option<Vec<ScheduleWindow>>,

    /// Seconds that must have elapsed since the version was published.
    pub minimum_release_age_secs: Option<u64>,

    /// Require a manual dashboard approval before the change is opened.
    pub dependency_dashboard_approval: Option<bool>,
}

impl RuleEffects {
    /// Effects that change nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the automerge flag.
    pub fn with_automerge(mut self, automerge: bool) -> Self {
        self.automerge = Some(automerge);
        self
    }

    /// Set the platform automerge flag.
    pub fn with_platform_automerge(mut self, platform_automerge: bool) -> Self {
        self.platform_automerge = Some(platform_automerge);
        self
    }

    /// Set the labels.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.add_labels = Some(labels);
        self
    }

    /// Set the schedule windows.
    pub fn with_schedule(mut self, schedule: Vec<ScheduleWindow>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Set the minimum release age in seconds.
    pub fn with_minimum_release_age_secs(mut self, secs: u64) -> Self {
        self.minimum_release_age_secs = Some(secs);
        self
    }

    /// Set the dashboard approval flag.
    pub fn with_dashboard_approval(mut self, required: bool) -> Self {
        self.dependency_dashboard_approval = Some(required);
        self
    }
}

/// A named matcher + effects pair, applied in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    /// Identifier used in diagnostics and match traces.
    pub name: String,

    /// Group the matched changes under one change set, when set.
    pub group_name: Option<String>,

    /// Predicates over the candidate.
    pub matchers: RuleMatchers,

    /// Policy fields this rule establishes on match.
    pub effects: RuleEffects,
}

impl Rule {
    /// Create a rule.
    pub fn new(name: impl Into<String>, matchers: RuleMatchers, effects: RuleEffects) -> Self {
        Self {
            name: name.into(),
            group_name: None,
            matchers,
            effects,
        }
    }

    /// Set the group name (builder pattern).
    pub fn with_group_name(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    /// Returns `true` if this rule matches the candidate.
    pub fn matches(&self, candidate: &Candidate) -> bool {
        self.matchers.matches(candidate)
    }

    /// Reject ambiguous matcher declarations.
    ///
    /// A present-but-empty matcher list could mean "match nothing" or
    /// "match any"; neither reading is safe to assume.
    pub fn validate(&self) -> Result<()> {
        let empty = |field: &str| PolicyError::InvalidRule {
            rule: self.name.clone(),
            reason: format!("{field} must not be an empty list (omit it to match any)"),
        };

        if self.matchers.managers.as_ref().is_some_and(|m| m.is_empty()) {
            return Err(empty("matchManagers"));
        }
        if self
            .matchers
            .update_types
            .as_ref()
            .is_some_and(|t| t.is_empty())
        {
            return Err(empty("matchUpdateTypes"));
        }
        if self
            .matchers
            .source_urls
            .as_ref()
            .is_some_and(|u| u.is_empty())
        {
            return Err(empty("matchSourceUrls"));
        }

        // Glob compilation failures surface here instead of degrading
        // into silent non-matches during evaluation.
        for glob in self.matchers.source_urls.iter().flatten() {
            if let Err(e) = compile_glob(glob) {
                return Err(PolicyError::InvalidRule {
                    rule: self.name.clone(),
                    reason: format!("matchSourceUrls glob '{glob}' does not compile: {e}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cargo_patch() -> Candidate {
        Candidate::new("cargo", UpdateType::Patch)
    }

    #[test]
    fn test_empty_matchers_match_any() {
        let matchers = RuleMatchers::any();
        assert!(matchers.matches(&cargo_patch()));
        assert!(matchers.matches(&Candidate::new("github-actions", UpdateType::Digest)));
    }

    #[test]
    fn test_manager_matcher() {
        let matchers = RuleMatchers::any().with_managers(vec!["cargo".to_string()]);
        assert!(matchers.matches(&cargo_patch()));
        assert!(!matchers.matches(&Candidate::new("npm", UpdateType::Patch)));
    }

    #[test]
    fn test_matchers_are_conjunctive() {
        let matchers = RuleMatchers::any()
            .with_managers(vec!["cargo".to_string()])
            .with_update_types(vec![UpdateType::Patch]);

        assert!(matchers.matches(&cargo_patch()));
        // Right manager, wrong update type.
        assert!(!matchers.matches(&Candidate::new("cargo", UpdateType::Major)));
        // Right update type, wrong manager.
        assert!(!matchers.matches(&Candidate::new("npm", UpdateType::Patch)));
    }

    #[test]
    fn test_source_url_glob() {
        let matchers = RuleMatchers::any()
            .with_source_urls(vec!["https://github.com/rust-lang/**".to_string()]);

        let matching = cargo_patch().with_source_url("https://github.com/rust-lang/regex");
        assert!(matchers.matches(&matching));

        let other = cargo_patch().with_source_url("https://github.com/serde-rs/serde");
        assert!(!matchers.matches(&other));

        // No source URL on the candidate: a URL matcher cannot hold.
        assert!(!matchers.matches(&cargo_patch()));
    }

    #[test]
    fn test_single_star_stops_at_slash() {
        assert!(glob_matches(
            "https://github.com/rust-lang/*",
            "https://github.com/rust-lang/regex"
        ));
        assert!(!glob_matches(
            "https://github.com/rust-lang/*",
            "https://github.com/rust-lang/regex/tree/main"
        ));
        assert!(glob_matches(
            "https://github.com/rust-lang/**",
            "https://github.com/rust-lang/regex/tree/main"
        ));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        // Dots in hostnames must be literal.
        assert!(!glob_matches("https://github.com/x", "https://githubXcom/x"));
        assert!(glob_matches("https://crates.io/*", "https://crates.io/serde"));
    }

    #[test]
    fn test_validate_rejects_empty_matcher_list() {
        let rule = Rule::new(
            "bad",
            RuleMatchers::any().with_managers(vec![]),
            RuleEffects::none(),
        );
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("matchManagers"));

        let rule = Rule::new(
            "ok",
            RuleMatchers::any().with_managers(vec!["cargo".to_string()]),
            RuleEffects::none(),
        );
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validate_compiles_source_url_globs() {
        // Metacharacter-heavy globs must compile (escaped) and match
        // literally, so validation accepts them up front.
        let rule = Rule::new(
            "weird-url",
            RuleMatchers::any()
                .with_source_urls(vec!["https://example.com/a+b(c)[d]/**".to_string()]),
            RuleEffects::none(),
        );
        assert!(rule.validate().is_ok());

        let candidate = Candidate::new("cargo", UpdateType::Patch)
            .with_source_url("https://example.com/a+b(c)[d]/repo");
        assert!(rule.matches(&candidate));
    }

    #[test]
    fn test_rule_group_name() {
        let rule = Rule::new("actions", RuleMatchers::any(), RuleEffects::none())
            .with_group_name("github actions");
        assert_eq!(rule.group_name.as_deref(), Some("github actions"));
    }
}
