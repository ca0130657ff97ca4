//! Verdict types threaded through the orchestrator.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::WorkflowRun;

/// Why a run was or was not skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The trigger event is exempt from skipping.
    DoNotSkip,
    /// An older run with identical content succeeded.
    SkipAfterSuccessfulDuplicate,
    /// A sibling run in flight is handling this work.
    ConcurrentSkipping,
    /// All changes since a known-good ancestor are irrelevant.
    Paths,
    /// Nothing justified a skip.
    NoTransferableRun,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoNotSkip => write!(f, "do_not_skip"),
            Self::SkipAfterSuccessfulDuplicate => write!(f, "skip_after_successful_duplicate"),
            Self::ConcurrentSkipping => write!(f, "concurrent_skipping"),
            Self::Paths => write!(f, "paths"),
            Self::NoTransferableRun => write!(f, "no_transferable_run"),
        }
    }
}

/// A conclusive top-level decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the current run should be skipped.
    pub should_skip: bool,
    /// The rule that decided.
    pub reason: SkipReason,
    /// The run that justified a skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<WorkflowRun>,
}

impl Verdict {
    /// Creates a skip verdict caused by `run`.
    #[must_use]
    pub fn skip(reason: SkipReason, run: WorkflowRun) -> Self {
        Self {
            should_skip: true,
            reason,
            cause: Some(run),
        }
    }

    /// Creates a "don't skip" verdict.
    #[must_use]
    pub fn run(reason: SkipReason) -> Self {
        Self {
            should_skip: false,
            reason,
            cause: None,
        }
    }
}

/// Outcome of one orchestration step.
///
/// Each component either concludes evaluation or hands control to the next
/// one; the first `Conclude` wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// No verdict; keep evaluating.
    Continue,
    /// A conclusive verdict.
    Conclude(Verdict),
}

impl Step {
    /// Returns true if the step concluded evaluation.
    #[must_use]
    pub fn is_conclusive(&self) -> bool {
        matches!(self, Self::Conclude(_))
    }
}

/// Per-filter path verdict.
///
/// Serialized the way the action output reports it: `true`, `false` or the
/// string `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterVerdict {
    /// Not resolved yet.
    #[default]
    Unknown,
    /// The filter's changes are covered by a prior successful run.
    Skip,
    /// A relevant change was found or the search gave up.
    DontSkip,
}

impl FilterVerdict {
    /// Returns true once the verdict is no longer unknown.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for FilterVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Skip => write!(f, "true"),
            Self::DontSkip => write!(f, "false"),
        }
    }
}

impl Serialize for FilterVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unknown => serializer.serialize_str("unknown"),
            Self::Skip => serializer.serialize_bool(true),
            Self::DontSkip => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for FilterVerdict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Bool(true) => Ok(Self::Skip),
            serde_json::Value::Bool(false) => Ok(Self::DontSkip),
            serde_json::Value::String(s) if s == "unknown" => Ok(Self::Unknown),
            other => Err(serde::de::Error::custom(format!(
                "expected true, false or \"unknown\", got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_display_matches_serde() {
        for reason in [
            SkipReason::DoNotSkip,
            SkipReason::SkipAfterSuccessfulDuplicate,
            SkipReason::ConcurrentSkipping,
            SkipReason::Paths,
            SkipReason::NoTransferableRun,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{reason}\""));
        }
    }

    #[test]
    fn test_run_verdict_has_no_cause() {
        let verdict = Verdict::run(SkipReason::DoNotSkip);
        assert!(!verdict.should_skip);
        assert!(verdict.cause.is_none());
        assert!(Step::Conclude(verdict).is_conclusive());
        assert!(!Step::Continue.is_conclusive());
    }

    #[test]
    fn test_filter_verdict_wire_format() {
        let json = serde_json::to_string(&[
            FilterVerdict::Skip,
            FilterVerdict::DontSkip,
            FilterVerdict::Unknown,
        ])
        .unwrap();
        assert_eq!(json, r#"[true,false,"unknown"]"#);

        let back: Vec<FilterVerdict> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0], FilterVerdict::Skip);
        assert!(!back[2].is_resolved());
        assert!(serde_json::from_str::<FilterVerdict>(r#""maybe""#).is_err());
    }
}
