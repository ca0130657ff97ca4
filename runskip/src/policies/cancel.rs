//! Outdated-run canceller.

use serde::Serialize;
use tracing::{info, warn};

use crate::core::WorkflowRun;
use crate::platform::CiPlatform;
use crate::registry::RunRegistry;

/// What the canceller attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CancelOutcome {
    /// Runs whose cancellation was accepted.
    pub cancelled: Vec<u64>,
    /// Runs whose cancellation failed, with the error message.
    pub failed: Vec<(u64, String)>,
}

impl CancelOutcome {
    /// Returns true if nothing was attempted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cancelled.is_empty() && self.failed.is_empty()
    }
}

/// Older, unfinished runs on the same branch and repository that test
/// different content.
///
/// Runs with the current tree are never candidates: a later duplicate
/// check may still want to skip in their favour.
#[must_use]
pub fn cancellation_candidates(registry: &RunRegistry) -> Vec<&WorkflowRun> {
    let current = registry.current();
    registry
        .older_runs()
        .filter(|r| {
            !r.is_completed()
                && r.branch == current.branch
                && r.repository == current.repository
                && !r.same_content(current)
        })
        .collect()
}

/// Requests cancellation of every candidate, once each.
///
/// Calls are awaited one after another. Failures are logged and reported
/// in the outcome; they never affect the current run's verdict.
pub async fn cancel_outdated(registry: &RunRegistry, platform: &dyn CiPlatform) -> CancelOutcome {
    let mut outcome = CancelOutcome::default();
    for run in cancellation_candidates(registry) {
        match platform.cancel_run(run.id).await {
            Ok(()) => {
                info!(run_id = run.id, "Cancelled outdated run");
                outcome.cancelled.push(run.id);
            }
            Err(err) => {
                warn!(run_id = run.id, error = %err, "Failed to cancel outdated run");
                outcome.failed.push((run.id, err.to_string()));
            }
        }
    }
    outcome
}
