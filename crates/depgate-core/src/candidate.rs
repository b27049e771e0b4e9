//! Update candidate descriptors.

use serde::{Deserialize, Serialize};

/// The kind of version change a candidate proposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// Breaking version bump (1.x -> 2.x).
    Major,

    /// Feature version bump (1.1 -> 1.2).
    Minor,

    /// Fix version bump (1.1.1 -> 1.1.2).
    Patch,

    /// Pinning a floating range to an exact version.
    Pin,

    /// Updating a pinned content digest (e.g. an action SHA).
    Digest,

    /// Reverting to an earlier version.
    Rollback,

    /// Bumping a range's lower bound in place.
    Bump,

    /// Swapping a dependency for its successor package.
    Replacement,
}

impl UpdateType {
    /// Get the update type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Major => "major",
            UpdateType::Minor => "minor",
            UpdateType::Patch => "patch",
            UpdateType::Pin => "pin",
            UpdateType::Digest => "digest",
            UpdateType::Rollback => "rollback",
            UpdateType::Bump => "bump",
            UpdateType::Replacement => "replacement",
        }
    }
}

impl std::str::FromStr for UpdateType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "major" => Ok(UpdateType::Major),
            "minor" => Ok(UpdateType::Minor),
            "patch" => Ok(UpdateType::Patch),
            "pin" => Ok(UpdateType::Pin),
            "digest" => Ok(UpdateType::Digest),
            "rollback" => Ok(UpdateType::Rollback),
            "bump" => Ok(UpdateType::Bump),
            "replacement" => Ok(UpdateType::Replacement),
            other => Err(format!("unknown update type: {other}")),
        }
    }
}

/// A proposed dependency or pin update awaiting a merge decision.
///
/// Immutable once constructed; the rule engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    /// Category of update mechanism (e.g. "cargo", "github-actions").
    pub manager: String,

    /// Kind of version change proposed.
    pub update_type: UpdateType,

    /// Origin identifier for the dependency, when known.
    pub source_url: Option<String>,

    /// Whether this update fixes a known vulnerability.
    pub is_vulnerability_fix: bool,
}

impl Candidate {
    /// Create a candidate with no source URL and no vulnerability flag.
    pub fn new(manager: impl Into<String>, update_type: UpdateType) -> Self {
        Self {
            manager: manager.into(),
            update_type,
            source_url: None,
            is_vulnerability_fix: false,
        }
    }

    /// Set the source URL (builder pattern).
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Mark this candidate as a vulnerability fix.
    pub fn vulnerability_fix(mut self) -> Self {
        self.is_vulnerability_fix = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_type_as_str() {
        assert_eq!(UpdateType::Major.as_str(), "major");
        assert_eq!(UpdateType::Digest.as_str(), "digest");
        assert_eq!(UpdateType::Replacement.as_str(), "replacement");
    }

    #[test]
    fn test_update_type_from_str_round_trip() {
        for ty in [
            UpdateType::Major,
            UpdateType::Minor,
            UpdateType::Patch,
            UpdateType::Pin,
            UpdateType::Digest,
            UpdateType::Rollback,
            UpdateType::Bump,
            UpdateType::Replacement,
        ] {
            let parsed: UpdateType = ty.as_str().parse().expect("parse");
            assert_eq!(parsed, ty);
        }
        assert!("banana".parse::<UpdateType>().is_err());
    }

    #[test]
    fn test_update_type_serde_snake_case() {
        let json = serde_json::to_string(&UpdateType::Patch).expect("serialize");
        assert_eq!(json, "\"patch\"");
    }

    #[test]
    fn test_candidate_builders() {
        let candidate = Candidate::new("cargo", UpdateType::Patch)
            .with_source_url("https://github.com/serde-rs/serde")
            .vulnerability_fix();

        assert_eq!(candidate.manager, "cargo");
        assert_eq!(candidate.update_type, UpdateType::Patch);
        assert_eq!(
            candidate.source_url.as_deref(),
            Some("https://github.com/serde-rs/serde")
        );
        assert!(candidate.is_vulnerability_fix);
    }
}
