//! depgate core - Dependency Update Policy & CI Gate Aggregation Engine
//!
//! Two independent components:
//!
//! - **Rule engine** ([`evaluate`]): folds an ordered list of policy
//!   rules over a base policy to decide, per update candidate, whether
//!   it may automerge, which labels it gets, when it may land, and how
//!   old the version must be. Safety overrides keep vulnerability
//!   fixes, major bumps, and replacements out of automerge regardless
//!   of what the rules say.
//! - **Gate aggregator** ([`aggregate`]): collapses the terminal
//!   outcomes of parallel CI jobs into the single pass/fail signal a
//!   required branch-protection check needs.
//!
//! The window evaluator ([`check_eligibility`]) consumes the rule
//! engine's output to answer "may this land right now".
//!
//! All three are pure, synchronous functions over already-collected
//! inputs; the policy document is loaded once via [`PolicyDocument`].

pub mod candidate;
pub mod error;
pub mod gate;
pub mod policy;
pub mod rule;
pub mod schedule;
pub mod schema;
pub mod telemetry;

// Re-export key types
pub use candidate::{Candidate, UpdateType};
pub use error::{PolicyError, Result};
pub use gate::{aggregate, GateReport, JobOutcome, OverallVerdict};
pub use policy::{
    evaluate, evaluate_traced, EffectivePolicy, ListMergeStrategy, MatchTrace, RuleSet,
};
pub use rule::{Rule, RuleEffects, RuleMatchers};
pub use schedule::{check_eligibility, Eligibility, EligibilityGate, ScheduleWindow};
pub use schema::{DocumentRule, PolicyDocument};
pub use telemetry::init_tracing;

/// depgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
