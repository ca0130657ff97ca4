//! Canonical workflow run entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RunConclusion, RunStatus};

/// One execution of a workflow, normalized from the platform's record.
///
/// A `WorkflowRun` always carries a tree hash: records without one never
/// make it past the registry. Runs are read-only snapshots for the
/// duration of a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    /// Platform run id.
    pub id: u64,
    /// Per-workflow sequence number.
    pub run_number: u64,
    /// Trigger event (e.g. "push", "pull_request").
    pub event: String,
    /// Content fingerprint of the tree the run tested.
    pub tree_hash: String,
    /// Commit the run was triggered for.
    pub commit_hash: String,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Conclusion, once completed.
    pub conclusion: Option<RunConclusion>,
    /// Link to the run on the platform.
    pub html_url: String,
    /// Head branch, if any.
    pub branch: Option<String>,
    /// Head repository identity (`owner/name`).
    #[serde(rename = "repo")]
    pub repository: String,
    /// Workflow (pipeline) id.
    pub workflow_id: u64,
    /// Creation time; totally orders runs.
    pub created_at: DateTime<Utc>,
}

impl WorkflowRun {
    /// Returns true if the run has finished.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Returns true if the run finished successfully.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.is_completed() && self.conclusion == Some(RunConclusion::Success)
    }

    /// Returns true if the run finished with a failure conclusion.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.is_completed() && self.conclusion == Some(RunConclusion::Failure)
    }

    /// Returns true if this run was created strictly before `other`.
    #[must_use]
    pub fn is_older_than(&self, other: &Self) -> bool {
        self.created_at < other.created_at
    }

    /// Returns true if both runs tested identical content.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.tree_hash == other.tree_hash
    }

    /// Short human-readable label, e.g. `#12 (run 4711)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("#{} (run {})", self.run_number, self.id)
    }
}

/// Picks the earliest-created run, breaking ties by id.
///
/// Used wherever several runs could justify the same verdict, so the
/// cited run does not depend on platform listing order.
pub fn earliest<'a, I>(runs: I) -> Option<&'a WorkflowRun>
where
    I: IntoIterator<Item = &'a WorkflowRun>,
{
    runs.into_iter().min_by_key(|run| (run.created_at, run.id))
}
