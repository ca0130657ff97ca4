//! Core domain model types for runskip.
//!
//! This module contains the canonical entities every component works on:
//! - Run status and conclusion enums
//! - The normalized workflow run and commit snapshots
//! - Verdicts and the step outcome threaded through the orchestrator

mod commit;
mod run;
mod status;
mod verdict;

pub use commit::CommitRecord;
pub use run::{earliest, WorkflowRun};
pub use status::{RunConclusion, RunStatus};
pub use verdict::{FilterVerdict, SkipReason, Step, Verdict};
