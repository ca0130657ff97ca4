//! Run registry: normalizes the platform's run listing.
//!
//! The registry fetches the current run and the recent runs of its
//! workflow, resolves the tree each run actually tested, and drops every
//! record that cannot be compared safely. Pull-request runs test a merge
//! result whose tree the listing does not report; those trees are resolved
//! through the merge commit and remembered in the [`MemoLedger`].

use tracing::{debug, info, warn};

use crate::context::{is_pull_request_event, RunContext};
use crate::core::{RunConclusion, RunStatus, WorkflowRun};
use crate::errors::{IdentityField, SkipError};
use crate::ledger::MemoLedger;
use crate::platform::{CiPlatform, RawRun};

/// The current run and its comparable siblings.
#[derive(Debug, Clone)]
pub struct RunRegistry {
    current: WorkflowRun,
    others: Vec<WorkflowRun>,
}

impl RunRegistry {
    /// Builds a registry from already normalized runs.
    ///
    /// `others` must not contain the current run; if it does, it is removed.
    #[must_use]
    pub fn from_runs(current: WorkflowRun, mut others: Vec<WorkflowRun>) -> Self {
        others.retain(|r| r.id != current.id);
        Self { current, others }
    }

    /// Fetches and normalizes the runs relevant to `ctx`.
    ///
    /// Fails fatally when the current run lacks a tree hash, workflow id or
    /// repository. Remote failures are returned as degradable
    /// [`SkipError::Platform`] errors. Tree resolutions are recorded in
    /// `ledger`.
    pub async fn load(
        ctx: &RunContext,
        platform: &dyn CiPlatform,
        ledger: &mut MemoLedger,
    ) -> Result<Self, SkipError> {
        let raw_current = platform.get_run(ctx.run_id).await?;
        Self::resolve(ctx, &raw_current, platform, ledger).await
    }

    /// Like [`RunRegistry::load`], with the current run already fetched.
    pub async fn resolve(
        ctx: &RunContext,
        raw_current: &RawRun,
        platform: &dyn CiPlatform,
        ledger: &mut MemoLedger,
    ) -> Result<Self, SkipError> {
        let workflow_id = raw_current
            .workflow_id
            .ok_or_else(|| SkipError::missing_identity(ctx.run_id, IdentityField::WorkflowId))?;
        let repository = raw_current
            .repository
            .clone()
            .or_else(|| (!ctx.repository.is_empty()).then(|| ctx.repository.clone()))
            .ok_or_else(|| SkipError::missing_identity(ctx.run_id, IdentityField::Repository))?;

        let tree_hash = if ctx.is_pull_request() {
            resolve_current_pr_tree(ctx, platform, ledger).await?
        } else {
            raw_current
                .tree_hash
                .clone()
                .ok_or_else(|| SkipError::missing_identity(ctx.run_id, IdentityField::TreeHash))?
        };

        let mut current = normalize(raw_current, tree_hash, workflow_id, repository);
        if current.event.is_empty() {
            current.event = ctx.event.clone();
        }

        let listed = platform.list_runs(workflow_id).await?;
        let mut others = Vec::with_capacity(listed.len());
        for raw in listed.iter().filter(|r| r.id != ctx.run_id) {
            let Some(tree_hash) = resolve_other_tree(raw, platform, ledger).await else {
                continue;
            };
            let Some(repository) = raw.repository.clone() else {
                debug!(run_id = raw.id, "Excluding run without a head repository");
                continue;
            };
            let workflow_id = raw.workflow_id.unwrap_or(workflow_id);
            others.push(normalize(raw, tree_hash, workflow_id, repository));
        }

        info!(
            run_id = current.id,
            tree_hash = %current.tree_hash,
            listed = listed.len(),
            comparable = others.len(),
            "Loaded run registry"
        );
        Ok(Self::from_runs(current, others))
    }

    /// Returns the run being evaluated.
    #[must_use]
    pub fn current(&self) -> &WorkflowRun {
        &self.current
    }

    /// Returns every comparable run except the current one.
    #[must_use]
    pub fn others(&self) -> &[WorkflowRun] {
        &self.others
    }

    /// Returns the runs created strictly before the current run.
    pub fn older_runs(&self) -> impl Iterator<Item = &WorkflowRun> {
        self.others
            .iter()
            .filter(move |r| r.is_older_than(&self.current))
    }

    /// Returns the other runs that have not completed.
    pub fn in_flight(&self) -> impl Iterator<Item = &WorkflowRun> {
        self.others.iter().filter(|r| !r.is_completed())
    }

    /// Returns older completed successful runs with the given tree.
    pub fn successful_with_tree<'a>(
        &'a self,
        tree_hash: &'a str,
    ) -> impl Iterator<Item = &'a WorkflowRun> + 'a {
        self.older_runs()
            .filter(move |r| r.is_successful() && r.tree_hash == tree_hash)
    }
}

fn normalize(raw: &RawRun, tree_hash: String, workflow_id: u64, repository: String) -> WorkflowRun {
    let status = raw
        .status
        .as_deref()
        .map(RunStatus::from_platform)
        .unwrap_or_default();
    let conclusion = raw.conclusion.as_deref().and_then(RunConclusion::from_platform);
    WorkflowRun {
        id: raw.id,
        run_number: raw.run_number,
        event: raw.event.clone(),
        tree_hash,
        commit_hash: raw.head_sha.clone(),
        status,
        conclusion,
        html_url: raw.html_url.clone(),
        branch: raw.head_branch.clone(),
        repository,
        workflow_id,
        created_at: raw.created_at,
    }
}

async fn resolve_current_pr_tree(
    ctx: &RunContext,
    platform: &dyn CiPlatform,
    ledger: &mut MemoLedger,
) -> Result<String, SkipError> {
    if let Some(tree) = ledger.tree_override(ctx.run_id) {
        debug!(run_id = ctx.run_id, tree_hash = tree, "Using recorded merge tree");
        return Ok(tree.to_string());
    }
    let commit = platform.get_commit(&ctx.commit_sha).await?;
    ledger.record_tree(ctx.run_id, commit.tree_sha.clone());
    debug!(
        run_id = ctx.run_id,
        commit = %ctx.commit_sha,
        tree_hash = %commit.tree_sha,
        "Resolved merge tree of current run"
    );
    Ok(commit.tree_sha)
}

/// Resolves the tree another run tested; `None` excludes the run.
async fn resolve_other_tree(
    raw: &RawRun,
    platform: &dyn CiPlatform,
    ledger: &mut MemoLedger,
) -> Option<String> {
    if let Some(tree) = ledger.tree_override(raw.id) {
        return Some(tree.to_string());
    }
    if !is_pull_request_event(&raw.event) {
        if raw.tree_hash.is_none() {
            info!(run_id = raw.id, "Excluding run without a tree hash (headless commit?)");
        }
        return raw.tree_hash.clone();
    }

    let Some(merge_sha) = raw.merge_commit_sha.as_deref() else {
        debug!(run_id = raw.id, "Excluding pull request run with unknown merge tree");
        return None;
    };
    match platform.get_commit(merge_sha).await {
        Ok(commit) => {
            ledger.record_tree(raw.id, commit.tree_sha.clone());
            Some(commit.tree_sha)
        }
        Err(err) => {
            warn!(run_id = raw.id, error = %err, "Could not resolve merge tree, excluding run");
            None
        }
    }
}
