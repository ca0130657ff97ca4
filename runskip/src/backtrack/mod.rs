//! Path backtracker.
//!
//! Walks first-parent ancestry from the current commit, looking for the
//! nearest ancestor whose tree is known good, while skipping over commits
//! that only touch paths a filter does not care about. All filters share
//! one walk: each step fetches a single commit and evaluates every filter
//! that is still unresolved against it.
//!
//! Filter state lives in an arena indexed in filter order. A filter
//! resolves to skip when the walk reaches a successful run's tree before a
//! relevant change, and to don't-skip when it meets a relevant change, its
//! backtracking limit, a missing file list, or the end of the walk.

mod filter;

pub use filter::{compile_filters, CompiledFilter};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{earliest, CommitRecord, FilterVerdict, WorkflowRun};
use crate::platform::CiPlatform;
use crate::registry::RunRegistry;

/// Hard ceiling on walk steps, whatever the filter limits say.
pub const MAX_BACKTRACK_STEPS: usize = 50;

/// Resolution state of one filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    /// Current verdict.
    pub verdict: FilterVerdict,
    /// Commits walked when the verdict was reached.
    pub distance: usize,
    /// Run whose tree resolved a skip.
    pub cause: Option<WorkflowRun>,
    /// Allow-listed files that resolved a don't-skip.
    pub matched_files: Vec<String>,
}

impl FilterState {
    fn resolve(&mut self, verdict: FilterVerdict, distance: usize) {
        self.verdict = verdict;
        self.distance = distance;
    }
}

/// Why the walk stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum WalkEnd {
    /// Every filter resolved on its own.
    Resolved,
    /// The walk ran past the root commit.
    NoParent,
    /// A commit could not be fetched.
    FetchFailed(String),
    /// The step ceiling was hit.
    StepCeiling,
}

/// Outcome of a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BacktrackResult {
    names: Vec<String>,
    states: Vec<FilterState>,
    /// Changed files per visited commit, index = distance from HEAD.
    /// `None` where the platform could not list them.
    pub changed_files: Vec<Option<Vec<String>>>,
    /// Why the walk stopped.
    pub end: WalkEnd,
}

impl BacktrackResult {
    /// Returns the state of a filter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FilterState> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.states[i])
    }

    /// Iterates over `(name, state)` in filter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterState)> {
        self.names.iter().map(String::as_str).zip(self.states.iter())
    }

    /// Number of commits visited.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.changed_files.len()
    }
}

/// Resolves every filter by walking ancestry from `start_sha`.
///
/// Never fails: a fetch failure, the root commit or the step ceiling
/// resolve all remaining filters to don't-skip.
pub async fn backtrack(
    filters: &[CompiledFilter],
    start_sha: &str,
    registry: &RunRegistry,
    platform: &dyn CiPlatform,
) -> BacktrackResult {
    let mut states = vec![FilterState::default(); filters.len()];
    let mut changed_files = Vec::new();
    let mut next_sha = Some(start_sha.to_string());
    let mut distance = 0;
    let mut end = WalkEnd::Resolved;

    while states.iter().any(|s| !s.verdict.is_resolved()) {
        let Some(sha) = next_sha.take() else {
            debug!(distance, "Reached the root commit");
            end = WalkEnd::NoParent;
            break;
        };
        let commit: CommitRecord = match platform.get_commit(&sha).await {
            Ok(raw) => raw.into(),
            Err(err) => {
                warn!(commit = %sha, distance, error = %err, "Commit fetch failed, stopping backtracking");
                end = WalkEnd::FetchFailed(err.to_string());
                break;
            }
        };
        changed_files.push(commit.changed_files.clone());

        let known_good = if distance >= 1 {
            earliest(registry.successful_with_tree(&commit.tree_sha))
        } else {
            None
        };

        for (filter, state) in filters.iter().zip(states.iter_mut()) {
            if state.verdict.is_resolved() {
                continue;
            }
            evaluate(filter, state, &commit, known_good, distance);
        }

        distance += 1;
        next_sha = commit.first_parent;

        if distance >= MAX_BACKTRACK_STEPS && states.iter().any(|s| !s.verdict.is_resolved()) {
            warn!(steps = distance, "Backtracking step ceiling reached");
            end = WalkEnd::StepCeiling;
            break;
        }
    }

    for state in states.iter_mut().filter(|s| !s.verdict.is_resolved()) {
        state.resolve(FilterVerdict::DontSkip, distance);
    }

    BacktrackResult {
        names: filters.iter().map(|f| f.name().to_string()).collect(),
        states,
        changed_files,
        end,
    }
}

fn evaluate(
    filter: &CompiledFilter,
    state: &mut FilterState,
    commit: &CommitRecord,
    known_good: Option<&WorkflowRun>,
    distance: usize,
) {
    let name = filter.name();

    if let Some(run) = known_good {
        info!(filter = name, distance, cause_run_id = run.id, commit = %commit.sha, "Ancestor tree matches a successful run");
        state.resolve(FilterVerdict::Skip, distance);
        state.cause = Some(run.clone());
        return;
    }
    if filter.limit().reached_at(distance) {
        debug!(filter = name, distance, "Backtracking limit reached");
        state.resolve(FilterVerdict::DontSkip, distance);
        return;
    }
    let Some(files) = commit.changed_files.as_deref() else {
        debug!(filter = name, commit = %commit.sha, "Changed files unknown, treating as relevant");
        state.resolve(FilterVerdict::DontSkip, distance);
        return;
    };
    if filter.all_ignored(files) {
        debug!(filter = name, commit = %commit.sha, "Commit only touches ignored paths");
        return;
    }
    match filter.allowed_matches(files) {
        Some(matched) if matched.is_empty() => {
            debug!(filter = name, commit = %commit.sha, "Commit touches no allow-listed path");
        }
        Some(matched) => {
            debug!(filter = name, commit = %commit.sha, matched = matched.len(), "Commit touches allow-listed paths");
            state.resolve(FilterVerdict::DontSkip, distance);
            state.matched_files = matched;
        }
        None => {
            debug!(filter = name, commit = %commit.sha, "Commit touches relevant paths");
            state.resolve(FilterVerdict::DontSkip, distance);
        }
    }
}
