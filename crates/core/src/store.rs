// crates/core/src/store.rs
//! Durable, content-addressed storage for built font packages.
//!
//! Artifacts live at `<root>/download/<id[0:2]>/<id[2:4]>/<id>.zip`. Their
//! presence is the only state that survives a restart, so [`OutputStore::exists`]
//! doubles as the job recovery check.
//!
//! Builders never write to the public path directly. They write to a
//! [`OutputStore::staging_path`] and the scheduler moves the file into place
//! with [`OutputStore::commit`], so a partial archive is never downloadable.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::types::FontId;

const DOWNLOAD_DIR: &str = "download";
const STAGING_DIR: &str = "tmp";
const ARTIFACT_EXT: &str = "zip";

#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
    public_url: String,
}

impl OutputStore {
    /// `public_url` is the externally visible origin, e.g. `http://www.example.com`.
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        let public_url = public_url.into();
        Self {
            root: root.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory served under `/download`.
    pub fn download_root(&self) -> PathBuf {
        self.root.join(DOWNLOAD_DIR)
    }

    /// `download/<aa>/<bb>/<id>.zip`, relative to the results root and to the
    /// public origin.
    pub fn relative_path(id: &FontId) -> String {
        let (a, b) = id.shards();
        format!("{DOWNLOAD_DIR}/{a}/{b}/{id}.{ARTIFACT_EXT}")
    }

    pub fn path_for(&self, id: &FontId) -> PathBuf {
        let (a, b) = id.shards();
        self.download_root()
            .join(a)
            .join(b)
            .join(format!("{id}.{ARTIFACT_EXT}"))
    }

    pub fn download_url(&self, id: &FontId) -> String {
        format!("{}/{}", self.public_url, Self::relative_path(id))
    }

    /// Whether the artifact for `id` is present.
    ///
    /// Any error other than "not found" is logged and reported as absent, so a
    /// flaky disk leads to a rebuild rather than a failed request.
    pub async fn exists(&self, id: &FontId) -> bool {
        let path = self.path_for(id);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.is_file(),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(font_id = %id, path = %path.display(), error = %e, "artifact stat failed, treating as missing");
                false
            }
        }
    }

    /// A fresh, unique path a builder may write the archive for `id` to.
    pub fn staging_path(&self, id: &FontId) -> PathBuf {
        self.root
            .join(STAGING_DIR)
            .join(format!("{id}.{}.{ARTIFACT_EXT}", ulid::Ulid::new()))
    }

    /// Create the download and staging directories.
    pub async fn prepare(&self) -> Result<(), StoreError> {
        for dir in [self.download_root(), self.root.join(STAGING_DIR)] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StoreError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Remove staged files left behind by a previous process. Returns how
    /// many were removed.
    pub async fn purge_staging(&self) -> Result<usize, StoreError> {
        let dir = self.root.join(STAGING_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove stale staging file")
                }
            }
        }
        Ok(removed)
    }

    /// Move a staged archive to its public location.
    ///
    /// The rename is atomic on the same filesystem; once this returns `Ok`
    /// the artifact is visible to [`OutputStore::exists`].
    pub async fn commit(&self, staged: &Path, id: &FontId) -> Result<PathBuf, StoreError> {
        match tokio::fs::metadata(staged).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(StoreError::StagedMissing {
                    path: staged.to_path_buf(),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::StagedMissing {
                    path: staged.to_path_buf(),
                })
            }
            Err(e) => return Err(StoreError::io(staged, e)),
        }

        let target = self.path_for(id);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        tokio::fs::rename(staged, &target)
            .await
            .map_err(|e| StoreError::io(&target, e))?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> FontId {
        FontId::parse(&format!("abcd{}", "0".repeat(60))).unwrap()
    }

    #[test]
    fn test_path_layout_is_sharded() {
        let store = OutputStore::new("/srv/results", "http://fonts.example.com/");
        let id = id();
        assert_eq!(
            store.path_for(&id),
            PathBuf::from(format!("/srv/results/download/ab/cd/{id}.zip"))
        );
        assert_eq!(
            store.download_url(&id),
            format!("http://fonts.example.com/download/ab/cd/{id}.zip")
        );
        assert_eq!(
            OutputStore::relative_path(&id),
            format!("download/ab/cd/{id}.zip")
        );
    }

    #[tokio::test]
    async fn test_exists_and_commit() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "http://localhost");
        store.prepare().await.unwrap();
        let id = id();

        assert!(!store.exists(&id).await);

        let staged = store.staging_path(&id);
        tokio::fs::write(&staged, b"PK").await.unwrap();
        let target = store.commit(&staged, &id).await.unwrap();

        assert_eq!(target, store.path_for(&id));
        assert!(store.exists(&id).await);
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn test_commit_missing_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "http://localhost");
        let staged = store.staging_path(&id());
        let err = store.commit(&staged, &id()).await.unwrap_err();
        assert!(matches!(err, StoreError::StagedMissing { .. }));
        assert!(!store.exists(&id()).await);
    }

    #[tokio::test]
    async fn test_directory_at_artifact_path_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "http://localhost");
        std::fs::create_dir_all(store.path_for(&id())).unwrap();
        assert!(!store.exists(&id()).await);
    }

    #[tokio::test]
    async fn test_unreadable_path_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "http://localhost");
        // a file where the first shard directory should be
        std::fs::create_dir_all(store.download_root()).unwrap();
        std::fs::write(store.download_root().join("ab"), b"not a dir").unwrap();

        let err = std::fs::metadata(store.path_for(&id())).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::NotFound);
        assert!(!store.exists(&id()).await);
    }

    #[tokio::test]
    async fn test_purge_staging() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path(), "http://localhost");
        assert_eq!(store.purge_staging().await.unwrap(), 0);

        store.prepare().await.unwrap();
        tokio::fs::write(store.staging_path(&id()), b"partial").await.unwrap();
        tokio::fs::write(store.staging_path(&id()), b"partial").await.unwrap();
        assert_eq!(store.purge_staging().await.unwrap(), 2);
    }
}
