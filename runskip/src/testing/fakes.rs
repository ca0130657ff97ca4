//! In-memory platform and artifact store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::fixture_time;
use crate::errors::PlatformError;
use crate::platform::{ArtifactMeta, ArtifactStore, CiPlatform, RawCommit, RawRun};

#[derive(Debug, Default)]
struct PlatformState {
    runs: BTreeMap<u64, RawRun>,
    commits: HashMap<String, RawCommit>,
    failing_commits: HashSet<String>,
    failing_cancels: HashSet<u64>,
    fail_list_runs: bool,
    cancelled: Vec<u64>,
    commit_fetches: usize,
}

/// A CI platform backed by in-memory maps.
///
/// Failures can be injected per commit, per cancellation, or for the run
/// listing as a whole.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    state: Mutex<PlatformState>,
}

impl InMemoryPlatform {
    /// Creates an empty platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a run.
    pub fn add_run(&self, run: RawRun) {
        self.state.lock().runs.insert(run.id, run);
    }

    /// Adds or replaces a commit.
    pub fn add_commit(&self, commit: RawCommit) {
        self.state.lock().commits.insert(commit.sha.clone(), commit);
    }

    /// Makes fetching `sha` fail.
    pub fn fail_commit(&self, sha: impl Into<String>) {
        self.state.lock().failing_commits.insert(sha.into());
    }

    /// Makes cancelling `run_id` fail.
    pub fn fail_cancel(&self, run_id: u64) {
        self.state.lock().failing_cancels.insert(run_id);
    }

    /// Makes listing runs fail.
    pub fn fail_list_runs(&self) {
        self.state.lock().fail_list_runs = true;
    }

    /// Returns the ids of successfully cancelled runs, in request order.
    #[must_use]
    pub fn cancelled(&self) -> Vec<u64> {
        self.state.lock().cancelled.clone()
    }

    /// Returns how many commit fetches were served or failed.
    #[must_use]
    pub fn commit_fetches(&self) -> usize {
        self.state.lock().commit_fetches
    }
}

#[async_trait]
impl CiPlatform for InMemoryPlatform {
    async fn get_run(&self, run_id: u64) -> Result<RawRun, PlatformError> {
        self.state
            .lock()
            .runs
            .get(&run_id)
            .cloned()
            .ok_or_else(|| PlatformError::new("get_run", format!("run {run_id} not found")))
    }

    async fn list_runs(&self, workflow_id: u64) -> Result<Vec<RawRun>, PlatformError> {
        let state = self.state.lock();
        if state.fail_list_runs {
            return Err(PlatformError::new("list_runs", "service unavailable"));
        }
        // Newest first, like the platform listing.
        let mut runs: Vec<RawRun> = state
            .runs
            .values()
            .filter(|r| r.workflow_id == Some(workflow_id))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(runs)
    }

    async fn get_commit(&self, sha: &str) -> Result<RawCommit, PlatformError> {
        let mut state = self.state.lock();
        state.commit_fetches += 1;
        if state.failing_commits.contains(sha) {
            return Err(PlatformError::new("get_commit", format!("{sha}: timed out")));
        }
        state
            .commits
            .get(sha)
            .cloned()
            .ok_or_else(|| PlatformError::new("get_commit", format!("{sha}: not found")))
    }

    async fn cancel_run(&self, run_id: u64) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if state.failing_cancels.contains(&run_id) {
            return Err(PlatformError::new("cancel_run", format!("run {run_id}: conflict")));
        }
        state.cancelled.push(run_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StoredBlob {
    data: Vec<u8>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    blobs: BTreeMap<String, StoredBlob>,
    uploads: usize,
}

/// An artifact store held in memory.
///
/// Each upload gets a creation time one second after the previous one, so
/// ordering by creation time is deterministic.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    state: Mutex<StoreState>,
}

impl InMemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored names in lexical order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.state.lock().blobs.keys().cloned().collect()
    }

    /// Returns the raw bytes stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().blobs.get(name).map(|b| b.data.clone())
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ArtifactMeta>, PlatformError> {
        Ok(self
            .state
            .lock()
            .blobs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, blob)| ArtifactMeta {
                name: name.clone(),
                created_at: blob.created_at,
                size_bytes: blob.data.len() as u64,
            })
            .collect())
    }

    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.uploads += 1;
        let created_at = fixture_time(0) + Duration::seconds(state.uploads as i64);
        state
            .blobs
            .insert(name.to_string(), StoredBlob { data, created_at });
        Ok(())
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>, PlatformError> {
        self.state
            .lock()
            .blobs
            .get(name)
            .map(|b| b.data.clone())
            .ok_or_else(|| PlatformError::new("download", format!("{name}: not found")))
    }

    async fn delete(&self, name: &str) -> Result<(), PlatformError> {
        self.state
            .lock()
            .blobs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PlatformError::new("delete", format!("{name}: not found")))
    }
}
