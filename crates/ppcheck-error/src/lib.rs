//! Error type shared by every ppcheck crate.
//!
//! Variants split into two groups. Per-trial and per-parameter failures
//! (`TrialRead`, `ParameterMissing`, `EmptySampleSet`, `DegenerateTest`) are
//! contained by the analysis pipeline and never abort a run; everything else
//! is a top-level failure of the inputs, configuration or output location.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which side of a (trial, parameter) pair lacked the parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSide {
    /// The posterior sample file has no (or an empty) column for the parameter.
    Samples,
    /// The injection record carries no true value for the parameter.
    GroundTruth,
}

impl fmt::Display for MissingSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Samples => f.write_str("samples"),
            Self::GroundTruth => f.write_str("ground_truth"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PpError {
    /// The posterior sample file or its paired injection record is unusable.
    #[error("trial {index} unreadable ({path}): {reason}")]
    TrialRead {
        index: usize,
        path: PathBuf,
        reason: String,
    },

    /// A requested parameter is absent from one trial.
    #[error("parameter `{parameter}` missing from trial {index} ({side})")]
    ParameterMissing {
        index: usize,
        parameter: String,
        side: MissingSide,
    },

    /// No fractional ranks were collected for a parameter across all trials.
    #[error("no fractional ranks collected for parameter `{parameter}`")]
    EmptySampleSet { parameter: String },

    /// The uniformity test ran on too few points to mean anything.
    #[error("uniformity test for `{parameter}` is degenerate with {count} point(s)")]
    DegenerateTest { parameter: String, count: usize },

    /// A configuration value failed validation.
    #[error("invalid config field `{field}`={value}: {reason}")]
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    /// A structured input file could not be parsed.
    #[error("parse failure in {path} line {line}: {detail}")]
    Parse {
        path: PathBuf,
        line: usize,
        detail: String,
    },

    /// A series or PSD document does not have the expected layout.
    #[error("malformed {kind} document: {detail}")]
    MalformedDocument { kind: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PpError {
    /// Shorthand for [`PpError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Shorthand for [`PpError::InvalidConfig`].
    pub fn invalid_config(
        field: impl Into<String>,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// `true` for failures the pipeline contains locally (skip and continue).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TrialRead { .. }
                | Self::ParameterMissing { .. }
                | Self::EmptySampleSet { .. }
                | Self::DegenerateTest { .. }
        )
    }

    /// Stable snake_case kind tag, used in skip ledgers and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TrialRead { .. } => "trial_read_failure",
            Self::ParameterMissing { .. } => "parameter_missing",
            Self::EmptySampleSet { .. } => "empty_sample_set",
            Self::DegenerateTest { .. } => "degenerate_test",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::Parse { .. } => "parse",
            Self::MalformedDocument { .. } => "malformed_document",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Internal(_) => "internal",
        }
    }
}

/// Workspace-wide result alias.
pub type Result<T, E = PpError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_trial_failures_are_recoverable() {
        let trial = PpError::TrialRead {
            index: 2,
            path: PathBuf::from("missing.dat"),
            reason: "no such file".to_owned(),
        };
        let missing = PpError::ParameterMissing {
            index: 0,
            parameter: "m1".to_owned(),
            side: MissingSide::GroundTruth,
        };
        assert!(trial.is_recoverable());
        assert!(missing.is_recoverable());
        assert!(!PpError::internal("boom").is_recoverable());
        assert!(!PpError::invalid_config("workers", 0, "must be >= 1").is_recoverable());
    }

    #[test]
    fn display_names_the_offending_pair() {
        let err = PpError::ParameterMissing {
            index: 3,
            parameter: "dist".to_owned(),
            side: MissingSide::Samples,
        };
        assert_eq!(
            err.to_string(),
            "parameter `dist` missing from trial 3 (samples)"
        );
        assert_eq!(err.kind(), "parameter_missing");
    }

    #[test]
    fn io_errors_convert() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        let err = open().unwrap_err();
        assert_eq!(err.kind(), "io");
        assert!(err.to_string().contains("gone"));
    }
}
