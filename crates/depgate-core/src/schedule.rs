//! Schedule windows and merge-eligibility evaluation.
//!
//! Eligibility combines two independent gates: a minimum release age
//! (the version must have been public for long enough) and a set of
//! recurring schedule windows (the merge must happen inside one). Both
//! must pass. The check is a pure function of the policy and the two
//! timestamps; all windows are defined and evaluated in UTC.

use chrono::{DateTime, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::policy::EffectivePolicy;

/// A recurring day-of-week + hour range during which merges may land.
///
/// `start_hour` is inclusive, `end_hour` exclusive. A window with
/// `start_hour > end_hour` wraps midnight: it covers `[start, 24)` and
/// `[0, end)` on each listed day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleWindow {
    /// Days of week (UTC) the window applies to.
    pub days: Vec<Weekday>,

    /// First hour inside the window (0-23, inclusive).
    pub start_hour: u8,

    /// First hour outside the window (0-24, exclusive).
    pub end_hour: u8,
}

impl ScheduleWindow {
    /// Create a window covering `start_hour..end_hour` on the given days.
    pub fn new(days: Vec<Weekday>, start_hour: u8, end_hour: u8) -> Self {
        Self {
            days,
            start_hour,
            end_hour,
        }
    }

    /// A window covering every hour of the given days.
    pub fn all_day(days: Vec<Weekday>) -> Self {
        Self::new(days, 0, 24)
    }

    /// Returns `true` if the instant falls inside this window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        use chrono::Datelike;

        if !self.days.contains(&at.weekday()) {
            return false;
        }

        let hour = at.hour() as u8;
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            // Wraps midnight.
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Which eligibility gate failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityGate {
    /// The version has not been public long enough.
    MinimumAge,

    /// The current time is outside every schedule window.
    ScheduleWindow,
}

/// The outcome of an eligibility check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Eligibility {
    /// Whether the candidate may be merged now.
    pub eligible: bool,

    /// Gates that failed (empty when eligible).
    pub failed_gates: Vec<EligibilityGate>,

    /// Human-readable explanation.
    pub reason: String,
}

/// Check whether a candidate governed by `policy` may merge at `now`.
///
/// Both gates are independent and both must pass. A `now` earlier than
/// `version_published_at` is clock skew: it is logged and treated as
/// "not yet old enough" rather than an error (fail closed).
pub fn check_eligibility(
    policy: &EffectivePolicy,
    now: DateTime<Utc>,
    version_published_at: DateTime<Utc>,
) -> Eligibility {
    let mut failed_gates = Vec::new();
    let elapsed = now - version_published_at;

    let clock_skew = elapsed < Duration::zero();
    if clock_skew {
        warn!(
            now = %now,
            published_at = %version_published_at,
            "version publish time is in the future; treating as not yet eligible"
        );
        failed_gates.push(EligibilityGate::MinimumAge);
    } else if let Some(min_secs) = policy.minimum_release_age_secs {
        // Integer comparison: constructing a Duration from an untrusted
        // age can panic past chrono's bound. `elapsed` is non-negative
        // here, so the cast is lossless.
        if (elapsed.num_seconds() as u64) < min_secs {
            failed_gates.push(EligibilityGate::MinimumAge);
        }
    }

    if !policy.schedule.is_empty() && !policy.schedule.iter().any(|w| w.contains(now)) {
        failed_gates.push(EligibilityGate::ScheduleWindow);
    }

    let reason = match (
        failed_gates.contains(&EligibilityGate::MinimumAge),
        failed_gates.contains(&EligibilityGate::ScheduleWindow),
    ) {
        (false, false) => "eligible".to_string(),
        (true, false) if clock_skew => {
            "minimum age gate failed: publish time is ahead of the clock".to_string()
        }
        (true, false) => format!(
            "minimum age gate failed: {}s elapsed < {}s required",
            elapsed.num_seconds(),
            policy.minimum_release_age_secs.unwrap_or(0),
        ),
        (false, true) => "schedule gate failed: outside every window".to_string(),
        (true, true) => "minimum age and schedule gates both failed".to_string(),
    };

    Eligibility {
        eligible: failed_gates.is_empty(),
        failed_gates,
        reason,
    }
}
