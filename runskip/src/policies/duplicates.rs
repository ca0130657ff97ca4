//! Do-not-skip short circuit and duplicate detection.

use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::core::{earliest, SkipReason, Step, Verdict};
use crate::errors::SkipError;
use crate::registry::RunRegistry;

/// Concludes "don't skip" when `event` is exempt from skipping.
#[must_use]
pub fn check_do_not_skip(event: &str, do_not_skip: &BTreeSet<String>) -> Step {
    if do_not_skip.contains(event) {
        info!(event, rule = "do_not_skip", "Trigger event is exempt from skipping");
        Step::Conclude(Verdict::run(SkipReason::DoNotSkip))
    } else {
        Step::Continue
    }
}

/// Resolves a verdict from older runs that tested the current tree.
///
/// A successful match skips, citing the earliest successful match. Without
/// one, a failed match aborts with [`SkipError::KnownFailure`]: content
/// known to fail is not silently re-attempted.
pub fn detect_duplicates(registry: &RunRegistry) -> Result<Step, SkipError> {
    let current = registry.current();
    let matches: Vec<_> = registry
        .older_runs()
        .filter(|r| r.same_content(current))
        .collect();

    if let Some(success) = earliest(matches.iter().copied().filter(|r| r.is_successful())) {
        info!(
            run_id = current.id,
            rule = "skip_after_successful_duplicate",
            cause_run_id = success.id,
            "Found successful run with identical content"
        );
        return Ok(Step::Conclude(Verdict::skip(
            SkipReason::SkipAfterSuccessfulDuplicate,
            success.clone(),
        )));
    }

    if let Some(failed) = earliest(matches.iter().copied().filter(|r| r.is_failed())) {
        return Err(SkipError::known_failure(failed.clone()));
    }

    debug!(
        run_id = current.id,
        candidates = matches.len(),
        "No conclusive duplicate"
    );
    Ok(Step::Continue)
}
