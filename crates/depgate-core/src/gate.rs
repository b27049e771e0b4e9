//! Gate aggregation: collapse parallel job outcomes into one verdict.
//!
//! Branch protection wants a single required check, but the jobs behind
//! it vary per run (path filters skip some). Aggregation reads the
//! final outcome of every declared prerequisite and renders one
//! deterministic pass/fail signal: skipped jobs count as pass, failed
//! and cancelled jobs count as fail, and a prerequisite that never
//! reported is treated as a failure rather than silently ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Terminal outcome of a single CI job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Job completed successfully.
    Success,

    /// Job completed with a failure.
    Failure,

    /// Job did not run (path filter, condition).
    Skipped,

    /// Job was cancelled before completing.
    Cancelled,
}

impl JobOutcome {
    /// Returns `true` if this outcome blocks the gate.
    pub fn is_blocking(&self) -> bool {
        matches!(self, JobOutcome::Failure | JobOutcome::Cancelled)
    }
}

/// The single signal rendered for branch protection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverallVerdict {
    Pass,
    Fail,
}

/// The outcome of aggregating prerequisite job outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateReport {
    /// The rendered signal.
    pub verdict: OverallVerdict,

    /// Why the gate failed (empty when it passed).
    pub violations: Vec<String>,

    /// Human-readable summary line.
    pub summary: String,
}

impl GateReport {
    /// Whether the gate passed.
    pub fn passed(&self) -> bool {
        self.verdict == OverallVerdict::Pass
    }
}

/// Aggregate the outcomes of `prerequisites` into one verdict.
///
/// Every prerequisite is looked up in `outcomes`; a missing entry means
/// the job never reported a terminal state and is treated as a failure.
/// Outcomes for jobs not listed as prerequisites are ignored. Terminal:
/// one evaluation per run, the outcome map is never mutated.
pub fn aggregate(
    outcomes: &BTreeMap<String, JobOutcome>,
    prerequisites: &[String],
) -> GateReport {
    let mut violations = Vec::new();

    for job in prerequisites {
        match outcomes.get(job) {
            Some(outcome) if outcome.is_blocking() => {
                violations.push(format!("job '{job}' finished with outcome {outcome:?}"));
            }
            Some(_) => {}
            None => {
                warn!(job = %job, "prerequisite never reported an outcome; counting as failure");
                violations.push(format!("job '{job}' never reported an outcome"));
            }
        }
    }

    let verdict = if violations.is_empty() {
        OverallVerdict::Pass
    } else {
        OverallVerdict::Fail
    };

    let summary = match verdict {
        OverallVerdict::Pass => format!(
            "gate passed: all {} prerequisite job(s) succeeded or were skipped",
            prerequisites.len()
        ),
        OverallVerdict::Fail => format!(
            "gate failed: {} of {} prerequisite job(s) blocking",
            violations.len(),
            prerequisites.len()
        ),
    };
    info!("{summary}");

    GateReport {
        verdict,
        violations,
        summary,
    }
}
