//! Run status and conclusion enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is waiting to start.
    Queued,
    /// Run is executing.
    InProgress,
    /// Run has finished; see its conclusion.
    Completed,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Queued
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl RunStatus {
    /// Maps a platform status string.
    ///
    /// Platforms report several pre-start states (`waiting`, `requested`,
    /// `pending`); all of them are in flight and map to `Queued`, as does
    /// anything unrecognized.
    #[must_use]
    pub fn from_platform(raw: &str) -> Self {
        match raw {
            "completed" => Self::Completed,
            "in_progress" => Self::InProgress,
            "queued" | "waiting" | "requested" | "pending" => Self::Queued,
            other => {
                tracing::debug!(status = other, "Unrecognized run status, treating as queued");
                Self::Queued
            }
        }
    }

    /// Returns true if the run has finished.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// The conclusion of a completed workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    /// All jobs succeeded.
    Success,
    /// At least one job failed.
    Failure,
    /// Neutral outcome.
    Neutral,
    /// The run was cancelled.
    Cancelled,
    /// The run was skipped.
    Skipped,
    /// The run exceeded its time budget.
    TimedOut,
}

impl fmt::Display for RunConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Neutral => write!(f, "neutral"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Skipped => write!(f, "skipped"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

impl RunConclusion {
    /// Maps a platform conclusion string; unknown values carry no conclusion.
    #[must_use]
    pub fn from_platform(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "neutral" => Some(Self::Neutral),
            "cancelled" => Some(Self::Cancelled),
            "skipped" => Some(Self::Skipped),
            "timed_out" => Some(Self::TimedOut),
            "" => None,
            other => {
                tracing::debug!(conclusion = other, "Unrecognized run conclusion, ignoring");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Queued.to_string(), "queued");
        assert_eq!(RunStatus::InProgress.to_string(), "in_progress");
        assert_eq!(RunStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn test_run_status_from_platform() {
        assert_eq!(RunStatus::from_platform("completed"), RunStatus::Completed);
        assert_eq!(RunStatus::from_platform("in_progress"), RunStatus::InProgress);
        assert_eq!(RunStatus::from_platform("waiting"), RunStatus::Queued);
        assert_eq!(RunStatus::from_platform("mystery"), RunStatus::Queued);
        assert!(!RunStatus::from_platform("requested").is_completed());
    }

    #[test]
    fn test_run_conclusion_from_platform() {
        assert_eq!(RunConclusion::from_platform("success"), Some(RunConclusion::Success));
        assert_eq!(RunConclusion::from_platform("timed_out"), Some(RunConclusion::TimedOut));
        assert_eq!(RunConclusion::from_platform("startup_failure"), None);
        assert_eq!(RunConclusion::from_platform(""), None);
    }

    #[test]
    fn test_run_conclusion_serialize() {
        let json = serde_json::to_string(&RunConclusion::TimedOut).unwrap();
        assert_eq!(json, r#""timed_out""#);

        let deserialized: RunConclusion = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, RunConclusion::TimedOut);
    }
}
