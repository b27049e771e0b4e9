//! Rule engine: ordered fold of matching rules into an effective policy.
//!
//! Rules are evaluated in declaration order against a candidate. A
//! matching rule's set fields are merged into a running policy snapshot:
//! scalars are overwritten, list fields are resolved per
//! [`ListMergeStrategy`]. After all rules, fixed-precedence safety
//! overrides are applied; they outrank anything the generic rules set,
//! so a breaking or security-sensitive change never automerges
//! silently.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidate::{Candidate, UpdateType};
use crate::error::Result;
use crate::rule::{Rule, RuleEffects};
use crate::schedule::ScheduleWindow;

/// Label appended to vulnerability-fix candidates.
pub const SECURITY_LABEL: &str = "security";

/// Label appended to replacement candidates.
pub const REPLACEMENT_LABEL: &str = "replacement";

// ---------------------------------------------------------------------------
// Effective policy
// ---------------------------------------------------------------------------

/// The fully merged decision for one candidate.
///
/// Every field is resolved; no further merging is needed. `Default` is
/// the conservative base: nothing automerges, no labels, no windows, no
/// minimum age, no approval requirement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EffectivePolicy {
    /// Merge the change automatically once eligible.
    pub automerge: bool,

    /// Delegate the merge to the hosting platform's queue.
    pub platform_automerge: bool,

    /// Labels to put on the change.
    pub labels: Vec<String>,

    /// Windows during which the change may land (empty = any time).
    pub schedule: Vec<ScheduleWindow>,

    /// Seconds that must have elapsed since the version was published.
    pub minimum_release_age_secs: Option<u64>,

    /// Require a manual dashboard approval before the change is opened.
    pub dependency_dashboard_approval: bool,
}

impl EffectivePolicy {
    /// Merge a matched rule's effects into this snapshot, returning the
    /// next snapshot. Set scalars overwrite; set lists are resolved per
    /// `list_merge`.
    fn apply(mut self, effects: &RuleEffects, list_merge: ListMergeStrategy) -> Self {
        if let Some(automerge) = effects.automerge {
            self.automerge = automerge;
        }
        if let Some(platform) = effects.platform_automerge {
            self.platform_automerge = platform;
        }
        if let Some(labels) = &effects.add_labels {
            self.labels = list_merge.resolve(self.labels, labels);
        }
        if let Some(schedule) = &effects.schedule {
            self.schedule = list_merge.resolve(self.schedule, schedule);
        }
        if let Some(secs) = effects.minimum_release_age_secs {
            self.minimum_release_age_secs = Some(secs);
        }
        if let Some(approval) = effects.dependency_dashboard_approval {
            self.dependency_dashboard_approval = approval;
        }
        self
    }

    fn push_label(&mut self, label: &str) {
        if !self.labels.iter().any(|l| l == label) {
            self.labels.push(label.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// List merge strategy
// ---------------------------------------------------------------------------

/// How list-valued effects combine when several rules match.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListMergeStrategy {
    /// The later rule's list fully supersedes the earlier one.
    #[default]
    Replace,

    /// The later rule's entries append, preserving order, skipping
    /// duplicates.
    Union,
}

impl ListMergeStrategy {
    fn resolve<T: Clone + PartialEq>(&self, current: Vec<T>, incoming: &[T]) -> Vec<T> {
        match self {
            ListMergeStrategy::Replace => incoming.to_vec(),
            ListMergeStrategy::Union => {
                let mut merged = current;
                for item in incoming {
                    if !merged.contains(item) {
                        merged.push(item.clone());
                    }
                }
                merged
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rule set
// ---------------------------------------------------------------------------

/// An ordered rule list plus the base policy it folds over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSet {
    /// Starting snapshot before any rule applies.
    pub base: EffectivePolicy,

    /// Rules in declaration order; later matches override earlier ones.
    pub rules: Vec<Rule>,

    /// Resolution for list-valued effects.
    pub list_merge: ListMergeStrategy,
}

impl RuleSet {
    /// An empty rule set over the conservative base policy.
    pub fn empty() -> Self {
        Self {
            base: EffectivePolicy::default(),
            rules: Vec::new(),
            list_merge: ListMergeStrategy::default(),
        }
    }

    /// Replace the base policy.
    pub fn with_base(mut self, base: EffectivePolicy) -> Self {
        self.base = base;
        self
    }

    /// Append a rule (builder pattern).
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the list merge strategy.
    pub fn with_list_merge(mut self, list_merge: ListMergeStrategy) -> Self {
        self.list_merge = list_merge;
        self
    }

    /// Validate every rule up front.
    pub fn validate(&self) -> Result<()> {
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// An effective policy together with the names of the rules that
/// produced it, in match order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchTrace {
    /// The resolved policy.
    pub policy: EffectivePolicy,

    /// Names of the rules that matched, in declaration order.
    pub matched_rules: Vec<String>,
}

/// Evaluate a candidate against a rule set, returning the effective
/// policy.
///
/// Deterministic: identical inputs always produce an identical policy.
/// Fails with [`crate::PolicyError::InvalidRule`] if any rule declares
/// an empty matcher list.
pub fn evaluate(rule_set: &RuleSet, candidate: &Candidate) -> Result<EffectivePolicy> {
    evaluate_traced(rule_set, candidate).map(|trace| trace.policy)
}

/// Like [`evaluate`], but also reports which rules matched so operators
/// can audit precedence.
pub fn evaluate_traced(rule_set: &RuleSet, candidate: &Candidate) -> Result<MatchTrace> {
    rule_set.validate()?;

    let mut policy = rule_set.base.clone();
    let mut matched_rules = Vec::new();

    for rule in &rule_set.rules {
        if rule.matches(candidate) {
            debug!(rule = %rule.name, manager = %candidate.manager, "rule matched");
            policy = policy.apply(&rule.effects, rule_set.list_merge);
            matched_rules.push(rule.name.clone());
        }
    }

    apply_safety_overrides(&mut policy, candidate);

    Ok(MatchTrace {
        policy,
        matched_rules,
    })
}

/// Fixed-precedence overrides applied after generic rule merging.
///
/// Ordering within this function does not matter: the three cases set
/// disjoint fields apart from `automerge`, which they all force off.
fn apply_safety_overrides(policy: &mut EffectivePolicy, candidate: &Candidate) {
    if candidate.is_vulnerability_fix {
        policy.automerge = false;
        policy.push_label(SECURITY_LABEL);
    }

    if candidate.update_type == UpdateType::Major {
        policy.automerge = false;
        policy.dependency_dashboard_approval = true;
    }

    if candidate.update_type == UpdateType::Replacement {
        policy.automerge = false;
        policy.push_label(REPLACEMENT_LABEL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleMatchers;
    use chrono::Weekday;

    fn patch_automerge_rule() -> Rule {
        Rule::new(
            "patch-automerge",
            RuleMatchers::any().with_update_types(vec![UpdateType::Patch]),
            RuleEffects::none().with_automerge(true),
        )
    }

    #[test]
    fn test_patch_rule_enables_automerge() {
        let rule_set = RuleSet::empty().with_rule(patch_automerge_rule());
        let candidate = Candidate::new("cargo", UpdateType::Patch);

        let policy = evaluate(&rule_set, &candidate).expect("evaluate");
        assert!(policy.automerge);
    }

    #[test]
    fn test_non_matching_rule_leaves_base() {
        let rule_set = RuleSet::empty().with_rule(patch_automerge_rule());
        let candidate = Candidate::new("cargo", UpdateType::Minor);

        let policy = evaluate(&rule_set, &candidate).expect("evaluate");
        assert!(!policy.automerge);
    }

    #[test]
    fn test_later_rule_overrides_scalar() {
        let rule_set = RuleSet::empty()
            .with_rule(patch_automerge_rule())
            .with_rule(Rule::new(
                "cargo-no-automerge",
                RuleMatchers::any().with_managers(vec!["cargo".to_string()]),
                RuleEffects::none().with_automerge(false),
            ));
        let candidate = Candidate::new("cargo", UpdateType::Patch);

        let policy = evaluate(&rule_set, &candidate).expect("evaluate");
        assert!(!policy.automerge, "later matching rule wins");
    }

    #[test]
    fn test_unset_fields_persist_from_earlier_rules() {
        let rule_set = RuleSet::empty()
            .with_rule(Rule::new(
                "base-labels",
                RuleMatchers::any(),
                RuleEffects::none()
                    .with_labels(vec!["dependencies".to_string()])
                    .with_automerge(true),
            ))
            .with_rule(Rule::new(
                "age-only",
                RuleMatchers::any(),
                RuleEffects::none().with_minimum_release_age_secs(3600),
            ));
        let candidate = Candidate::new("cargo", UpdateType::Patch);

        let policy = evaluate(&rule_set, &candidate).expect("evaluate");
        assert!(policy.automerge, "earlier rule's scalar persists");
        assert_eq!(policy.labels, vec!["dependencies"]);
        assert_eq!(policy.minimum_release_age_secs, Some(3600));
    }

    #[test]
    fn test_replace_strategy_supersedes_lists() {
        let rule_set = RuleSet::empty()
            .with_rule(Rule::new(
                "broad-schedule",
                RuleMatchers::any(),
                RuleEffects::none()
                    .with_schedule(vec![ScheduleWindow::all_day(vec![Weekday::Sat])])
                    .with_labels(vec!["dependencies".to_string()]),
            ))
            .with_rule(Rule::new(
                "cargo-schedule",
                RuleMatchers::any().with_managers(vec!["cargo".to_string()]),
                RuleEffects::none()
                    .with_schedule(vec![ScheduleWindow::new(vec![Weekday::Mon], 2, 6)])
                    .with_labels(vec!["rust".to_string()]),
            ));
        let candidate = Candidate::new("cargo", UpdateType::Patch);

        let policy = evaluate(&rule_set, &candidate).expect("evaluate");
        assert_eq!(policy.schedule.len(), 1);
        assert_eq!(policy.schedule[0].days, vec![Weekday::Mon]);
        assert_eq!(policy.labels, vec!["rust"]);
    }

    #[test]
    fn test_union_strategy_accumulates_lists() {
        let rule_set = RuleSet::empty()
            .with_list_merge(ListMergeStrategy::Union)
            .with_rule(Rule::new(
                "labels-a",
                RuleMatchers::any(),
                RuleEffects::none().with_labels(vec!["dependencies".to_string()]),
            ))
            .with_rule(Rule::new(
                "labels-b",
                RuleMatchers::any(),
                RuleEffects::none()
                    .with_labels(vec!["rust".to_string(), "dependencies".to_string()]),
            ));
        let candidate = Candidate::new("cargo", UpdateType::Patch);

        let policy = evaluate(&rule_set, &candidate).expect("evaluate");
        assert_eq!(policy.labels, vec!["dependencies", "rust"]);
    }

    #[test]
    fn test_vulnerability_fix_never_automerges() {
        let rule_set = RuleSet::empty().with_rule(patch_automerge_rule());
        let candidate = Candidate::new("cargo", UpdateType::Patch).vulnerability_fix();

        let policy = evaluate(&rule_set, &candidate).expect("evaluate");
        assert!(!policy.automerge, "security override outranks rules");
        assert!(policy.labels.contains(&SECURITY_LABEL.to_string()));
    }

    #[test]
    fn test_major_never_automerges_and_requires_approval() {
        let rule_set = RuleSet::empty().with_rule(Rule::new(
            "automerge-everything",
            RuleMatchers::any(),
            RuleEffects::none().with_automerge(true),
        ));
        let candidate = Candidate::new("cargo", UpdateType::Major);

        let policy = evaluate(&rule_set, &candidate).expect("evaluate");
        assert!(!policy.automerge);
        assert!(policy.dependency_dashboard_approval);
    }

    #[test]
    fn test_replacement_never_automerges_and_is_labeled() {
        let rule_set = RuleSet::empty().with_rule(Rule::new(
            "automerge-everything",
            RuleMatchers::any(),
            RuleEffects::none().with_automerge(true),
        ));
        let candidate = Candidate::new("cargo", UpdateType::Replacement);

        let policy = evaluate(&rule_set, &candidate).expect("evaluate");
        assert!(!policy.automerge);
        assert!(policy.labels.contains(&REPLACEMENT_LABEL.to_string()));
    }

    #[test]
    fn test_security_label_not_duplicated() {
        let rule_set = RuleSet::empty().with_rule(Rule::new(
            "already-labeled",
            RuleMatchers::any(),
            RuleEffects::none().with_labels(vec![SECURITY_LABEL.to_string()]),
        ));
        let candidate = Candidate::new("cargo", UpdateType::Patch).vulnerability_fix();

        let policy = evaluate(&rule_set, &candidate).expect("evaluate");
        assert_eq!(
            policy.labels.iter().filter(|l| *l == SECURITY_LABEL).count(),
            1
        );
    }

    #[test]
    fn test_evaluate_rejects_empty_matcher_list() {
        let rule_set = RuleSet::empty().with_rule(Rule::new(
            "ambiguous",
            RuleMatchers::any().with_update_types(vec![]),
            RuleEffects::none(),
        ));
        let candidate = Candidate::new("cargo", UpdateType::Patch);

        let err = evaluate(&rule_set, &candidate).unwrap_err();
        assert!(err.to_string().contains("ambiguous") || err.to_string().contains("empty"));
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let rule_set = RuleSet::empty()
            .with_rule(patch_automerge_rule())
            .with_rule(Rule::new(
                "cargo-labels",
                RuleMatchers::any().with_managers(vec!["cargo".to_string()]),
                RuleEffects::none().with_labels(vec!["rust".to_string()]),
            ));
        let candidate = Candidate::new("cargo", UpdateType::Patch)
            .with_source_url("https://github.com/serde-rs/serde");

        let first = evaluate(&rule_set, &candidate).expect("evaluate");
        let second = evaluate(&rule_set, &candidate).expect("evaluate");
        assert_eq!(first, second);
    }

    #[test]
    fn test_match_trace_reports_rules_in_order() {
        let rule_set = RuleSet::empty()
            .with_rule(patch_automerge_rule())
            .with_rule(Rule::new(
                "cargo-labels",
                RuleMatchers::any().with_managers(vec!["cargo".to_string()]),
                RuleEffects::none().with_labels(vec!["rust".to_string()]),
            ));
        let candidate = Candidate::new("cargo", UpdateType::Patch);

        let trace = evaluate_traced(&rule_set, &candidate).expect("evaluate");
        assert_eq!(trace.matched_rules, vec!["patch-automerge", "cargo-labels"]);
    }
}
