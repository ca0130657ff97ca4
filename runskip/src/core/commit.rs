//! Commit snapshot used by the path backtracker.

use serde::{Deserialize, Serialize};

/// A commit as seen by the backtracker: its tree, the paths it changed and
/// its first parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Commit sha.
    pub sha: String,
    /// Tree sha of the commit's content.
    pub tree_sha: String,
    /// Changed paths relative to the first parent.
    ///
    /// `None` when the platform could not list them (very large diffs); such
    /// a commit is treated as touching every path.
    pub changed_files: Option<Vec<String>>,
    /// First parent sha; `None` for a root commit.
    pub first_parent: Option<String>,
}
