//! Ports to the host CI platform.
//!
//! The engine never talks HTTP itself. A host adapter implements
//! [`CiPlatform`] for run and commit queries and [`ArtifactStore`] for the
//! blob storage backing the memo ledger. Every call is awaited in sequence
//! by the orchestrator.

mod fs_store;
mod records;

pub use fs_store::FsArtifactStore;
pub use records::{ArtifactMeta, RawCommit, RawRun};

use async_trait::async_trait;

use crate::errors::PlatformError;

/// Run and commit queries against the CI platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CiPlatform: Send + Sync {
    /// Fetches a single run.
    async fn get_run(&self, run_id: u64) -> Result<RawRun, PlatformError>;

    /// Lists recent runs of a workflow (one bounded page).
    async fn list_runs(&self, workflow_id: u64) -> Result<Vec<RawRun>, PlatformError>;

    /// Fetches a commit with its changed files and parents.
    async fn get_commit(&self, sha: &str) -> Result<RawCommit, PlatformError>;

    /// Requests cancellation of a run. Best effort.
    async fn cancel_run(&self, run_id: u64) -> Result<(), PlatformError>;
}

/// Named blob storage with platform-side retention.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Lists artifacts whose name starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<ArtifactMeta>, PlatformError>;

    /// Uploads a blob under `name`, replacing any existing one.
    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), PlatformError>;

    /// Downloads the blob stored under `name`.
    async fn download(&self, name: &str) -> Result<Vec<u8>, PlatformError>;

    /// Deletes the blob stored under `name`.
    async fn delete(&self, name: &str) -> Result<(), PlatformError>;
}
