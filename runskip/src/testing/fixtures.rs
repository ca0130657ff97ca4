//! Builders for raw platform records.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::platform::{RawCommit, RawRun};

/// Fixed reference time plus `minute` minutes.
#[must_use]
pub fn fixture_time(minute: i64) -> DateTime<Utc> {
    let base = Utc
        .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .unwrap_or_default();
    base + Duration::minutes(minute)
}

/// Builds a [`RawRun`] with sensible defaults.
///
/// By default run `id` is a successful `push` run on `main` of
/// `acme/widgets`, workflow 1, tree `tree-{id}`, commit `sha-{id}`, created
/// `id` minutes after [`fixture_time`]`(0)`.
#[derive(Debug, Clone)]
pub struct RunBuilder {
    run: RawRun,
}

impl RunBuilder {
    /// Starts a builder for run `id`.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self {
            run: RawRun {
                id,
                run_number: id,
                event: "push".to_string(),
                head_sha: format!("sha-{id}"),
                tree_hash: Some(format!("tree-{id}")),
                status: Some("completed".to_string()),
                conclusion: Some("success".to_string()),
                head_branch: Some("main".to_string()),
                repository: Some("acme/widgets".to_string()),
                workflow_id: Some(1),
                created_at: fixture_time(i64::try_from(id).unwrap_or(0)),
                html_url: format!("https://ci.example/acme/widgets/runs/{id}"),
                merge_commit_sha: None,
            },
        }
    }

    /// Sets the tree hash.
    #[must_use]
    pub fn tree(mut self, tree: &str) -> Self {
        self.run.tree_hash = Some(tree.to_string());
        self
    }

    /// Removes the tree hash.
    #[must_use]
    pub fn no_tree(mut self) -> Self {
        self.run.tree_hash = None;
        self
    }

    /// Sets the head commit.
    #[must_use]
    pub fn head(mut self, sha: &str) -> Self {
        self.run.head_sha = sha.to_string();
        self
    }

    /// Sets the trigger event.
    #[must_use]
    pub fn event(mut self, event: &str) -> Self {
        self.run.event = event.to_string();
        self
    }

    /// Sets the run number.
    #[must_use]
    pub fn run_number(mut self, number: u64) -> Self {
        self.run.run_number = number;
        self
    }

    /// Marks the run completed with `conclusion`.
    #[must_use]
    pub fn concluded(mut self, conclusion: &str) -> Self {
        self.run.status = Some("completed".to_string());
        self.run.conclusion = Some(conclusion.to_string());
        self
    }

    /// Marks the run in progress.
    #[must_use]
    pub fn in_progress(mut self) -> Self {
        self.run.status = Some("in_progress".to_string());
        self.run.conclusion = None;
        self
    }

    /// Marks the run queued.
    #[must_use]
    pub fn queued(mut self) -> Self {
        self.run.status = Some("queued".to_string());
        self.run.conclusion = None;
        self
    }

    /// Sets the head branch.
    #[must_use]
    pub fn branch(mut self, branch: &str) -> Self {
        self.run.head_branch = Some(branch.to_string());
        self
    }

    /// Sets the head repository.
    #[must_use]
    pub fn repository(mut self, repository: &str) -> Self {
        self.run.repository = Some(repository.to_string());
        self
    }

    /// Removes the head repository.
    #[must_use]
    pub fn no_repository(mut self) -> Self {
        self.run.repository = None;
        self
    }

    /// Sets the workflow id.
    #[must_use]
    pub fn workflow(mut self, workflow_id: u64) -> Self {
        self.run.workflow_id = Some(workflow_id);
        self
    }

    /// Sets the creation time to `minute` minutes after the fixture time.
    #[must_use]
    pub fn created_minute(mut self, minute: i64) -> Self {
        self.run.created_at = fixture_time(minute);
        self
    }

    /// Sets the pull request merge commit.
    #[must_use]
    pub fn merge_commit(mut self, sha: &str) -> Self {
        self.run.merge_commit_sha = Some(sha.to_string());
        self
    }

    /// Returns the raw run.
    #[must_use]
    pub fn build(self) -> RawRun {
        self.run
    }
}

/// Builds a [`RawCommit`].
#[must_use]
pub fn commit(sha: &str, tree: &str, files: &[&str], parent: Option<&str>) -> RawCommit {
    RawCommit {
        sha: sha.to_string(),
        tree_sha: tree.to_string(),
        files: Some(files.iter().map(|f| (*f).to_string()).collect()),
        parents: parent.map(str::to_string).into_iter().collect(),
    }
}

/// Builds a first-parent chain `c{len-1} -> ... -> c0`, newest first.
///
/// Commit `c{i}` has tree `t{i}` and changes the files returned by
/// `files(i)`; `c0` is a root commit.
pub fn linear_history<F>(len: usize, mut files: F) -> Vec<RawCommit>
where
    F: FnMut(usize) -> Vec<String>,
{
    (0..len)
        .rev()
        .map(|i| RawCommit {
            sha: format!("c{i}"),
            tree_sha: format!("t{i}"),
            files: Some(files(i)),
            parents: if i == 0 {
                Vec::new()
            } else {
                vec![format!("c{}", i - 1)]
            },
        })
        .collect()
}
