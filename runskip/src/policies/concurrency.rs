//! Concurrency resolver.

use tracing::{debug, info};

use crate::config::ConcurrencyPolicy;
use crate::core::{earliest, SkipReason, Step, Verdict, WorkflowRun};
use crate::registry::RunRegistry;

/// Resolves a verdict among in-flight sibling runs.
///
/// Candidates are the other runs that have not completed. When several
/// candidates qualify, the earliest created one is cited.
#[must_use]
pub fn resolve_concurrency(registry: &RunRegistry, policy: ConcurrencyPolicy) -> Step {
    let current = registry.current();
    let qualifies = |run: &WorkflowRun| match policy {
        ConcurrencyPolicy::Never => false,
        ConcurrencyPolicy::Always => true,
        ConcurrencyPolicy::OutdatedRuns => run.created_at > current.created_at,
        ConcurrencyPolicy::SameContent => run.same_content(current),
        ConcurrencyPolicy::SameContentNewer => {
            run.same_content(current) && run.run_number < current.run_number
        }
    };

    match earliest(registry.in_flight().filter(|r| qualifies(r))) {
        Some(cause) => {
            info!(
                run_id = current.id,
                rule = "concurrent_skipping",
                policy = %policy,
                cause_run_id = cause.id,
                "Skipping in favour of a concurrent run"
            );
            Step::Conclude(Verdict::skip(SkipReason::ConcurrentSkipping, cause.clone()))
        }
        None => {
            debug!(run_id = current.id, policy = %policy, "No concurrent run qualifies");
            Step::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RunConclusion, RunStatus};
    use crate::testing::fixture_time;

    fn run(id: u64, run_number: u64, tree: &str, minute: i64, status: RunStatus) -> WorkflowRun {
        WorkflowRun {
            id,
            run_number,
            event: "push".to_string(),
            tree_hash: tree.to_string(),
            commit_hash: format!("sha-{id}"),
            status,
            conclusion: status.is_completed().then_some(RunConclusion::Success),
            html_url: String::new(),
            branch: Some("main".to_string()),
            repository: "acme/widgets".to_string(),
            workflow_id: 1,
            created_at: fixture_time(minute),
        }
    }

    fn cause(step: Step) -> Option<u64> {
        match step {
            Step::Conclude(verdict) => verdict.cause.map(|r| r.id),
            Step::Continue => None,
        }
    }

    #[test]
    fn test_always_needs_a_candidate() {
        let alone = RunRegistry::from_runs(
            run(2, 2, "T", 2, RunStatus::InProgress),
            vec![run(1, 1, "T", 1, RunStatus::Completed)],
        );
        assert_eq!(resolve_concurrency(&alone, ConcurrencyPolicy::Always), Step::Continue);

        let busy = RunRegistry::from_runs(
            run(2, 2, "T", 2, RunStatus::InProgress),
            vec![run(9, 9, "X", 9, RunStatus::Queued), run(1, 1, "Y", 1, RunStatus::InProgress)],
        );
        assert_eq!(cause(resolve_concurrency(&busy, ConcurrencyPolicy::Always)), Some(1));
        assert_eq!(resolve_concurrency(&busy, ConcurrencyPolicy::Never), Step::Continue);
    }

    #[test]
    fn test_outdated_runs_needs_a_newer_candidate() {
        let registry = RunRegistry::from_runs(
            run(5, 5, "T", 5, RunStatus::InProgress),
            vec![run(4, 4, "A", 4, RunStatus::InProgress), run(6, 6, "B", 6, RunStatus::Queued)],
        );
        assert_eq!(cause(resolve_concurrency(&registry, ConcurrencyPolicy::OutdatedRuns)), Some(6));
    }

    #[test]
    fn test_same_content() {
        let registry = RunRegistry::from_runs(
            run(5, 5, "T", 5, RunStatus::InProgress),
            vec![run(4, 4, "A", 4, RunStatus::InProgress), run(6, 6, "T", 6, RunStatus::Queued)],
        );
        assert_eq!(cause(resolve_concurrency(&registry, ConcurrencyPolicy::SameContent)), Some(6));
    }

    #[test]
    fn test_same_content_newer_lets_the_lower_number_proceed() {
        let first = run(1, 7, "T", 0, RunStatus::InProgress);
        let second = run(2, 8, "T", 0, RunStatus::InProgress);

        let for_first = RunRegistry::from_runs(first.clone(), vec![second.clone()]);
        let for_second = RunRegistry::from_runs(second, vec![first]);

        let policy = ConcurrencyPolicy::SameContentNewer;
        assert_eq!(resolve_concurrency(&for_first, policy), Step::Continue);
        assert_eq!(cause(resolve_concurrency(&for_second, policy)), Some(1));
    }
}
