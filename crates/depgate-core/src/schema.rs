//! Policy document schema and loading.
//!
//! The on-disk policy is a JSON document: top-level defaults plus an
//! ordered list of rules, using the camelCase field names of the source
//! configuration format. Loading validates everything up front — a
//! malformed document or ambiguous rule aborts the load and no partial
//! rule set is ever produced.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::candidate::UpdateType;
use crate::error::{PolicyError, Result};
use crate::policy::{EffectivePolicy, ListMergeStrategy, RuleSet};
use crate::rule::{Rule, RuleEffects, RuleMatchers};
use crate::schedule::ScheduleWindow;

/// One rule as written in the policy document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentRule {
    /// Human-readable description; doubles as the rule name in traces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,

    // Matchers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_managers: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_update_types: Option<Vec<UpdateType>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_source_urls: Option<Vec<String>>,

    // Effects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automerge: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_automerge: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_labels: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<ScheduleWindow>>,

    /// Human-readable duration, e.g. "3 days" or "8 hours".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_release_age: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_dashboard_approval: Option<bool>,
}

impl DocumentRule {
    fn into_rule(self, index: usize) -> Result<Rule> {
        let name = self
            .description
            .clone()
            .unwrap_or_else(|| format!("rule #{index}"));

        let minimum_release_age_secs = self
            .minimum_release_age
            .as_deref()
            .map(parse_age)
            .transpose()?;

        let mut rule = Rule::new(
            name,
            RuleMatchers {
                managers: self.match_managers,
                update_types: self.match_update_types,
                source_urls: self.match_source_urls,
            },
            RuleEffects {
                automerge: self.automerge,
                platform_automerge: self.platform_automerge,
                add_labels: self.add_labels,
                schedule: self.schedule,
                minimum_release_age_secs,
                dependency_dashboard_approval: self.dependency_dashboard_approval,
            },
        );
        rule.group_name = self.group_name;
        rule.validate()?;
        Ok(rule)
    }
}

/// The whole policy document: top-level defaults plus ordered rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyDocument {
    #[serde(default)]
    pub automerge: bool,

    #[serde(default)]
    pub platform_automerge: bool,

    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default)]
    pub schedule: Vec<ScheduleWindow>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_release_age: Option<String>,

    #[serde(default)]
    pub dependency_dashboard_approval: bool,

    /// How list-valued effects combine across matching rules.
    #[serde(default)]
    pub list_merge: ListMergeStrategy,

    #[serde(default)]
    pub rules: Vec<DocumentRule>,
}

impl PolicyDocument {
    /// Parse a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a document from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Validate the document and convert it into a runtime rule set.
    ///
    /// Fatal on the first invalid rule or unparseable age: no partial
    /// rule set is produced.
    pub fn into_rule_set(self) -> Result<RuleSet> {
        let minimum_release_age_secs = self
            .minimum_release_age
            .as_deref()
            .map(parse_age)
            .transpose()?;

        let base = EffectivePolicy {
            automerge: self.automerge,
            platform_automerge: self.platform_automerge,
            labels: self.labels,
            schedule: self.schedule,
            minimum_release_age_secs,
            dependency_dashboard_approval: self.dependency_dashboard_approval,
        };

        let mut rule_set = RuleSet::empty()
            .with_base(base)
            .with_list_merge(self.list_merge);
        for (index, doc_rule) in self.rules.into_iter().enumerate() {
            rule_set.rules.push(doc_rule.into_rule(index)?);
        }
        Ok(rule_set)
    }
}

/// Upper bound for `minimumReleaseAge`: ten years in seconds. A larger
/// age would hold every update forever and overflow downstream duration
/// arithmetic.
const MAX_AGE_SECS: u64 = 10 * 365 * 86_400;

/// Parse a human-readable age like "3 days", "8 hours" or "90 seconds"
/// into seconds. Ages above [`MAX_AGE_SECS`] are rejected.
fn parse_age(value: &str) -> Result<u64> {
    let invalid = |reason: &str| PolicyError::InvalidAge {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = value.split_whitespace();
    let amount: u64 = parts
        .next()
        .ok_or_else(|| invalid("empty value"))?
        .parse()
        .map_err(|_| invalid("expected a non-negative integer amount"))?;
    let unit = parts.next().ok_or_else(|| invalid("missing unit"))?;
    if parts.next().is_some() {
        return Err(invalid("expected '<amount> <unit>'"));
    }

    let multiplier = match unit {
        "second" | "seconds" => 1,
        "minute" | "minutes" => 60,
        "hour" | "hours" => 3600,
        "day" | "days" => 86_400,
        "week" | "weeks" => 7 * 86_400,
        _ => return Err(invalid("unknown unit (use seconds/minutes/hours/days/weeks)")),
    };

    let secs = amount
        .checked_mul(multiplier)
        .ok_or_else(|| invalid("value overflows"))?;
    if secs > MAX_AGE_SECS {
        return Err(invalid("exceeds the maximum supported age (10 years)"));
    }
    Ok(secs)
}
