//! Explicit invocation context handed to every component.

use serde::{Deserialize, Serialize};

/// Trigger events whose runs test a merge result rather than the head branch.
const PULL_REQUEST_EVENTS: &[&str] = &["pull_request", "pull_request_target"];

/// Identifies the invocation being evaluated.
///
/// Components never read process state; everything they need about the
/// current invocation travels in this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    /// Repository identity (`owner/name`).
    pub repository: String,
    /// The current run id.
    pub run_id: u64,
    /// The trigger event of the current run.
    pub event: String,
    /// The checked-out commit (the merge commit for pull requests).
    pub commit_sha: String,
    /// The job evaluating the decision, used to scope the ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
}

impl RunContext {
    /// Creates a new run context.
    #[must_use]
    pub fn new(
        repository: impl Into<String>,
        run_id: u64,
        event: impl Into<String>,
        commit_sha: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            run_id,
            event: event.into(),
            commit_sha: commit_sha.into(),
            job: None,
        }
    }

    /// Sets the job name.
    #[must_use]
    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Returns the job name, or `"default"` when unset.
    #[must_use]
    pub fn job_or_default(&self) -> &str {
        self.job.as_deref().unwrap_or("default")
    }

    /// Returns true if the current run was triggered by a pull request.
    #[must_use]
    pub fn is_pull_request(&self) -> bool {
        is_pull_request_event(&self.event)
    }
}

/// Returns true if `event` tests a pull request merge result.
#[must_use]
pub fn is_pull_request_event(event: &str) -> bool {
    PULL_REQUEST_EVENTS.contains(&event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_context_builder() {
        let ctx = RunContext::new("acme/widgets", 99, "push", "abc").with_job("build");
        assert_eq!(ctx.run_id, 99);
        assert_eq!(ctx.job_or_default(), "build");
        assert!(!ctx.is_pull_request());
    }

    #[test]
    fn test_pull_request_events() {
        assert!(RunContext::new("a/b", 1, "pull_request", "m").is_pull_request());
        assert!(is_pull_request_event("pull_request_target"));
        assert!(!is_pull_request_event("push"));
        assert_eq!(RunContext::new("a/b", 1, "push", "m").job_or_default(), "default");
    }

    #[test]
    fn test_run_context_serialization() {
        let ctx = RunContext::new("acme/widgets", 3, "push", "abc");
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(!json.contains("job"));

        let back: RunContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
    }
}
