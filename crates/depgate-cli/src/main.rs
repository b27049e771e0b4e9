//! depgate - dependency update policy and CI gate aggregation CLI
//!
//! ## Commands
//!
//! - `evaluate`: resolve the effective policy for one update candidate
//!   against a policy document, optionally checking merge eligibility
//! - `gate`: collapse recorded job outcomes into a single pass/fail
//!   verdict suitable for a required branch-protection check

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::Level;

use depgate_core::{
    aggregate, check_eligibility, evaluate_traced, init_tracing, Candidate, Eligibility,
    GateReport, JobOutcome, PolicyDocument, UpdateType,
};

#[derive(Parser)]
#[command(name = "depgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dependency update policy & CI gate aggregation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the effective policy for an update candidate
    Evaluate {
        /// Path to the policy document (JSON)
        #[arg(short, long)]
        policy: PathBuf,

        /// Update mechanism category (e.g. cargo, github-actions)
        #[arg(short, long)]
        manager: String,

        /// Kind of version change (major, minor, patch, pin, digest,
        /// rollback, bump, replacement)
        #[arg(short = 't', long)]
        update_type: UpdateType,

        /// Source URL of the dependency, if known
        #[arg(long)]
        source_url: Option<String>,

        /// Mark the candidate as a vulnerability fix
        #[arg(long)]
        vulnerability: bool,

        /// When the candidate version was published (RFC 3339);
        /// enables the eligibility check
        #[arg(long)]
        published_at: Option<DateTime<Utc>>,

        /// Evaluation time (RFC 3339, default: now)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Aggregate recorded job outcomes into one verdict
    Gate {
        /// Path to a JSON map of job name -> outcome
        /// (success, failure, skipped, cancelled)
        #[arg(short, long)]
        outcomes: PathBuf,

        /// Prerequisite job name (repeatable)
        #[arg(short, long = "require", required = true)]
        require: Vec<String>,
    },
}

/// Everything `evaluate` reports for one candidate.
#[derive(Debug, Serialize)]
struct EvaluationReport {
    candidate: Candidate,
    policy: depgate_core::EffectivePolicy,
    matched_rules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eligibility: Option<Eligibility>,
}

fn run_evaluate(
    policy_path: &PathBuf,
    candidate: Candidate,
    published_at: Option<DateTime<Utc>>,
    now: Option<DateTime<Utc>>,
) -> Result<EvaluationReport> {
    let rule_set = PolicyDocument::from_file(policy_path)
        .with_context(|| format!("failed to load policy document {}", policy_path.display()))?
        .into_rule_set()
        .context("policy document failed validation")?;

    let trace = evaluate_traced(&rule_set, &candidate).context("policy evaluation failed")?;

    let eligibility = published_at.map(|published| {
        check_eligibility(&trace.policy, now.unwrap_or_else(Utc::now), published)
    });

    Ok(EvaluationReport {
        candidate,
        policy: trace.policy,
        matched_rules: trace.matched_rules,
        eligibility,
    })
}

fn run_gate(outcomes_path: &PathBuf, require: &[String]) -> Result<GateReport> {
    let contents = std::fs::read_to_string(outcomes_path)
        .with_context(|| format!("failed to read outcomes file {}", outcomes_path.display()))?;
    let outcomes: BTreeMap<String, JobOutcome> =
        serde_json::from_str(&contents).context("outcomes file is not a valid job->outcome map")?;

    Ok(aggregate(&outcomes, require))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Evaluate {
            policy,
            manager,
            update_type,
            source_url,
            vulnerability,
            published_at,
            now,
        } => {
            let mut candidate = Candidate::new(manager, update_type);
            if let Some(url) = source_url {
                candidate = candidate.with_source_url(url);
            }
            if vulnerability {
                candidate = candidate.vulnerability_fix();
            }

            let report = run_evaluate(&policy, candidate, published_at, now)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Gate { outcomes, require } => {
            let report = run_gate(&outcomes, &require)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.passed() {
                // Non-zero exit so the aggregator can back a required check.
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
