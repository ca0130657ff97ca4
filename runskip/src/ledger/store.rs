//! Loading and persisting the ledger through an artifact store.

use tracing::{debug, info, warn};

use super::{codec, MemoLedger};
use crate::errors::SkipError;
use crate::platform::{ArtifactMeta, ArtifactStore};

/// Returns the blob name prefix scoping a ledger to one workflow and job.
#[must_use]
pub fn ledger_prefix(workflow_id: u64, job: &str) -> String {
    let job: String = job
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("runskip-ledger-{workflow_id}-{job}-")
}

/// Reads and writes ledger blobs sharing one prefix.
pub struct LedgerStore<'a> {
    store: &'a dyn ArtifactStore,
    prefix: String,
}

impl std::fmt::Debug for LedgerStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl<'a> LedgerStore<'a> {
    /// Creates a ledger store over `store` for blobs named `prefix*`.
    #[must_use]
    pub fn new(store: &'a dyn ArtifactStore, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Returns the blob prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Name of the blob a run writes. Run ids are zero-padded so names sort
    /// in run order.
    #[must_use]
    pub fn blob_name(&self, run_id: u64) -> String {
        format!("{}{run_id:020}", self.prefix)
    }

    async fn list_sorted(&self) -> Result<Vec<ArtifactMeta>, SkipError> {
        let mut blobs = self.store.list(&self.prefix).await?;
        blobs.retain(|b| b.name.starts_with(&self.prefix));
        blobs.sort_by(|a, b| (a.created_at, &a.name).cmp(&(b.created_at, &b.name)));
        Ok(blobs)
    }

    /// Loads the ledger by merging every retained blob.
    ///
    /// Concurrent invocations each write their own blob from the same
    /// starting point, so no single blob holds everything. Blobs are folded
    /// oldest first and, per run, the most recently updated entry wins.
    ///
    /// No blob yields an empty ledger. A blob that cannot be decoded
    /// (corrupt, foreign schema, future version) is skipped with a warning.
    /// Only store failures are errors.
    pub async fn load(&self) -> Result<MemoLedger, SkipError> {
        let blobs = self.list_sorted().await?;
        if blobs.is_empty() {
            debug!(prefix = %self.prefix, "No ledger blob found, starting empty");
            return Ok(MemoLedger::new());
        }

        let mut ledger = MemoLedger::new();
        let mut merged = 0_usize;
        for blob in &blobs {
            let bytes = self.store.download(&blob.name).await?;
            match codec::decode(&bytes) {
                Ok(copy) => {
                    debug!(blob = %blob.name, entries = copy.len(), "Read ledger blob");
                    ledger.merge(copy);
                    merged += 1;
                }
                Err(err) => warn!(blob = %blob.name, error = %err, "Ignoring unreadable ledger blob"),
            }
        }
        info!(
            prefix = %self.prefix,
            blobs = merged,
            entries = ledger.len(),
            "Loaded memo ledger"
        );
        Ok(ledger)
    }

    /// Writes the ledger as this run's blob and prunes old blobs.
    ///
    /// Pruning is best effort: delete failures are logged and the blob that
    /// was just written is never deleted. Returns the written blob name.
    pub async fn persist(
        &self,
        ledger: &MemoLedger,
        run_id: u64,
        blob_retention: usize,
    ) -> Result<String, SkipError> {
        let (blob, metrics) = codec::encode(ledger)?;
        let name = self.blob_name(run_id);
        self.store.upload(&name, blob).await?;
        debug!(
            blob = %name,
            entries = ledger.len(),
            json_bytes = metrics.json_bytes,
            compressed_bytes = metrics.compressed_bytes,
            "Persisted memo ledger"
        );

        self.prune_blobs(&name, blob_retention.max(1)).await;
        Ok(name)
    }

    async fn prune_blobs(&self, keep_name: &str, keep: usize) {
        let blobs = match self.list_sorted().await {
            Ok(blobs) => blobs,
            Err(err) => {
                warn!(error = %err, "Could not list ledger blobs for pruning");
                return;
            }
        };
        if blobs.len() <= keep {
            return;
        }

        let excess = blobs.len() - keep;
        for blob in blobs.iter().take(excess) {
            if blob.name == keep_name {
                continue;
            }
            match self.store.delete(&blob.name).await {
                Ok(()) => debug!(blob = %blob.name, "Deleted old ledger blob"),
                Err(err) => warn!(blob = %blob.name, error = %err, "Could not delete old ledger blob"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PlatformError;
    use crate::platform::MockArtifactStore;
    use crate::testing::InMemoryArtifactStore;

    #[test]
    fn test_ledger_prefix_sanitizes_job() {
        assert_eq!(ledger_prefix(12, "build (linux)"), "runskip-ledger-12-build__linux_-");
    }

    #[tokio::test]
    async fn test_load_without_blobs_is_empty() {
        let artifacts = InMemoryArtifactStore::new();
        let store = LedgerStore::new(&artifacts, "p-");
        let ledger = store.load().await.unwrap();
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let artifacts = InMemoryArtifactStore::new();
        let store = LedgerStore::new(&artifacts, "p-");

        let mut first = MemoLedger::new();
        first.record_tree(1, "a");
        store.persist(&first, 1, 4).await.unwrap();

        let mut second = first.clone();
        second.record_tree(2, "b");
        let name = store.persist(&second, 2, 4).await.unwrap();
        assert_eq!(name, "p-00000000000000000002");

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.tree_override(2), Some("b"));
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn test_load_merges_concurrent_blobs() {
        let artifacts = InMemoryArtifactStore::new();
        let store = LedgerStore::new(&artifacts, "p-");

        // Two invocations started from the same empty ledger.
        let mut first = MemoLedger::new();
        first.record_tree(1, "merge-1");
        store.persist(&first, 1, 4).await.unwrap();

        let mut second = MemoLedger::new();
        second.record_tree(2, "merge-2");
        store.persist(&second, 2, 4).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.tree_override(1), Some("merge-1"));
        assert_eq!(loaded.tree_override(2), Some("merge-2"));
        assert!(!loaded.is_dirty());
    }

    #[tokio::test]
    async fn test_unreadable_blob_does_not_hide_the_others() {
        let artifacts = InMemoryArtifactStore::new();
        let store = LedgerStore::new(&artifacts, "p-");

        let mut ledger = MemoLedger::new();
        ledger.record_tree(1, "merge-1");
        store.persist(&ledger, 1, 4).await.unwrap();
        artifacts.upload(&store.blob_name(2), b"junk".to_vec()).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.tree_override(1), Some("merge-1"));
    }

    #[tokio::test]
    async fn test_persist_prunes_old_blobs() {
        let artifacts = InMemoryArtifactStore::new();
        let store = LedgerStore::new(&artifacts, "p-");
        let ledger = MemoLedger::new();

        for run_id in 1..=6 {
            store.persist(&ledger, run_id, 3).await.unwrap();
        }

        let names = artifacts.names();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&store.blob_name(6)));
        assert!(!names.contains(&store.blob_name(1)));
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_ignored() {
        let artifacts = InMemoryArtifactStore::new();
        artifacts.upload("p-00000000000000000009", b"junk".to_vec()).await.unwrap();

        let store = LedgerStore::new(&artifacts, "p-");
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_is_an_error() {
        let mut artifacts = MockArtifactStore::new();
        artifacts
            .expect_list()
            .returning(|_| Err(PlatformError::new("list", "503")));

        let store = LedgerStore::new(&artifacts, "p-");
        assert!(!store.load().await.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_delete_failure_does_not_fail_persist() {
        let mut artifacts = MockArtifactStore::new();
        artifacts.expect_upload().times(1).returning(|_, _| Ok(()));
        artifacts.expect_list().returning(|_| {
            let now = chrono::Utc::now();
            Ok((1..=3_i64)
                .map(|i| ArtifactMeta {
                    name: format!("p-{i:020}"),
                    created_at: now + chrono::Duration::seconds(i),
                    size_bytes: 1,
                })
                .collect())
        });
        artifacts
            .expect_delete()
            .times(2)
            .returning(|_| Err(PlatformError::new("delete", "forbidden")));

        let store = LedgerStore::new(&artifacts, "p-");
        let name = store.persist(&MemoLedger::new(), 3, 1).await.unwrap();
        assert_eq!(name, "p-00000000000000000003");
    }
}
