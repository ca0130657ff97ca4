//! Directory-backed artifact store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

use super::{ArtifactMeta, ArtifactStore};
use crate::errors::PlatformError;

/// Stores each artifact as one file under a root directory.
///
/// Useful for local runs of the engine and for tests; CI hosts normally
/// provide their own artifact service.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`. The directory is created on first upload.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, operation: &str, name: &str) -> Result<PathBuf, PlatformError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(PlatformError::new(
                operation,
                format!("invalid artifact name '{name}'"),
            ));
        }
        Ok(self.root.join(name))
    }
}

fn io_error(operation: &str, err: &std::io::Error) -> PlatformError {
    PlatformError::new(operation, err.to_string())
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ArtifactMeta>, PlatformError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("list", &e)),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error("list", &e))? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !name.starts_with(prefix) {
                continue;
            }
            let metadata = entry.metadata().await.map_err(|e| io_error("list", &e))?;
            if !metadata.is_file() {
                continue;
            }
            let created_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            found.push(ArtifactMeta {
                name,
                created_at,
                size_bytes: metadata.len(),
            });
        }
        found.sort_by(|a, b| (a.created_at, &a.name).cmp(&(b.created_at, &b.name)));
        Ok(found)
    }

    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), PlatformError> {
        let path = self.path_for("upload", name)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error("upload", &e))?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| io_error("upload", &e))
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>, PlatformError> {
        let path = self.path_for("download", name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| io_error("download", &e))
    }

    async fn delete(&self, name: &str) -> Result<(), PlatformError> {
        let path = self.path_for("delete", name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_error("delete", &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_list_download_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("artifacts"));

        assert!(store.list("memo-").await.unwrap().is_empty());

        store.upload("memo-1", b"one".to_vec()).await.unwrap();
        store.upload("memo-2", b"two".to_vec()).await.unwrap();
        store.upload("other-1", b"x".to_vec()).await.unwrap();

        let listed = store.list("memo-").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"memo-1"));
        assert_eq!(store.download("memo-2").await.unwrap(), b"two");

        store.delete("memo-1").await.unwrap();
        assert_eq!(store.list("memo-").await.unwrap().len(), 1);
        assert!(store.download("memo-1").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let err = store.upload("../escape", Vec::new()).await.unwrap_err();
        assert_eq!(err.operation, "upload");
    }
}
