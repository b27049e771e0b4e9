//! Error taxonomy for policy loading and evaluation.
//!
//! Only load-time problems are errors: a malformed document or an
//! ambiguous rule aborts loading and no partial policy is produced.
//! Runtime anomalies (a prerequisite that never reported, a publish
//! timestamp ahead of the clock) are handled as warnings inside the
//! evaluators and never surface as `Err`.

use thiserror::Error;

/// Errors produced while loading or evaluating a policy document.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("invalid minimum release age '{value}': {reason}")]
    InvalidAge { value: String, reason: String },

    #[error("invalid policy document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_rule_display() {
        let err = PolicyError::InvalidRule {
            rule: "cargo-patch".to_string(),
            reason: "matchManagers must not be empty".to_string(),
        };
        assert!(err.to_string().contains("cargo-patch"));
        assert!(err.to_string().contains("matchManagers"));
    }

    #[test]
    fn test_invalid_age_display() {
        let err = PolicyError::InvalidAge {
            value: "3 fortnights".to_string(),
            reason: "unknown unit".to_string(),
        };
        assert!(err.to_string().contains("3 fortnights"));
        assert!(err.to_string().contains("unknown unit"));
    }

    #[test]
    fn test_document_error_from_serde() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PolicyError::from(parse_err);
        assert!(err.to_string().contains("invalid policy document"));
    }
}
