//! Unnormalized records as the platform reports them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::CommitRecord;

/// A workflow run exactly as listed by the platform.
///
/// Almost every field is optional: headless commits have no tree, some
/// listings omit the head repository, and status strings vary between
/// platform versions. The registry decides what is usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRun {
    /// Run id.
    pub id: u64,
    /// Per-workflow run number.
    #[serde(default)]
    pub run_number: u64,
    /// Trigger event.
    #[serde(default)]
    pub event: String,
    /// Head commit sha.
    #[serde(default)]
    pub head_sha: String,
    /// Tree of the head commit, if the commit still exists.
    #[serde(default)]
    pub tree_hash: Option<String>,
    /// Status string (`queued`, `in_progress`, `completed`, ...).
    #[serde(default)]
    pub status: Option<String>,
    /// Conclusion string, once completed.
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Head branch.
    #[serde(default)]
    pub head_branch: Option<String>,
    /// Head repository identity (`owner/name`).
    #[serde(default)]
    pub repository: Option<String>,
    /// Workflow id.
    #[serde(default)]
    pub workflow_id: Option<u64>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Link to the run.
    #[serde(default)]
    pub html_url: String,
    /// Merge commit of the pull request this run tested, when known.
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
}

/// A commit as returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommit {
    /// Commit sha.
    pub sha: String,
    /// Tree sha.
    pub tree_sha: String,
    /// Changed paths; `None` when the diff was too large to list.
    #[serde(default)]
    pub files: Option<Vec<String>>,
    /// Parent shas, first parent first.
    #[serde(default)]
    pub parents: Vec<String>,
}

impl From<RawCommit> for CommitRecord {
    fn from(raw: RawCommit) -> Self {
        Self {
            sha: raw.sha,
            tree_sha: raw.tree_sha,
            changed_files: raw.files,
            first_parent: raw.parents.into_iter().next(),
        }
    }
}

/// Metadata of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Artifact name.
    pub name: String,
    /// When it was uploaded.
    pub created_at: DateTime<Utc>,
    /// Stored size.
    pub size_bytes: u64,
}
