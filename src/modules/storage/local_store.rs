//! Local filesystem blob store
//!
//! Layout under the root:
//! - `{root}/.blobs/{user_id}/{uuid}`: current content, one blob per stored upload
//! - `{root}/.versions/{user_id}/{file_id}/{version}`: archived versions
//! - `{root}/.staging/{uuid}`: partial writes before the rename
//! - `{root}/{user_id}/{filename}`: legacy location, read as a fallback
//!
//! User ids are numeric, so the dot-prefixed trees never clash with a user's
//! filename namespace.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::AppError;

const BLOBS_DIR: &str = ".blobs";
const VERSIONS_DIR: &str = ".versions";
const STAGING_DIR: &str = ".staging";

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self, user_id: i64) -> PathBuf {
        self.root.join(user_id.to_string())
    }

    pub fn file_path(&self, user_id: i64, filename: &str) -> PathBuf {
        self.user_dir(user_id).join(filename)
    }

    /// A fresh, never-used path for a new content blob
    pub fn new_blob_path(&self, user_id: i64) -> PathBuf {
        self.root
            .join(BLOBS_DIR)
            .join(user_id.to_string())
            .join(Uuid::new_v4().to_string())
    }

    pub fn version_path(&self, user_id: i64, file_id: i64, version: i32) -> PathBuf {
        self.versions_dir(user_id, file_id).join(version.to_string())
    }

    fn versions_dir(&self, user_id: i64, file_id: i64) -> PathBuf {
        self.root
            .join(VERSIONS_DIR)
            .join(user_id.to_string())
            .join(file_id.to_string())
    }

    pub async fn ensure_user_dir(&self, user_id: i64) -> Result<PathBuf, AppError> {
        let dir = self.user_dir(user_id);
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Internal(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        Ok(dir)
    }

    /// Write bytes to a unique staging file, then rename it into place
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            create_dir(parent).await?;
        }
        let staging = self.root.join(STAGING_DIR);
        create_dir(&staging).await?;

        let tmp = staging.join(Uuid::new_v4().to_string());
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write {}: {}", tmp.display(), e)))?;
        if let Err(e) = fs::rename(&tmp, path).await {
            self.remove(&tmp).await;
            return Err(AppError::Internal(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            )));
        }

        debug!(path = %path.display(), size = bytes.len(), "Stored blob");
        Ok(())
    }

    /// Read bytes, `None` when the path does not exist
    pub async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, AppError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Internal(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Best-effort removal; a missing file is not an error
    pub async fn remove(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed blob"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), "Failed to remove blob: {}", e),
        }
    }

    /// Best-effort removal of a file's archived versions
    pub async fn remove_versions(&self, user_id: i64, file_id: i64) {
        remove_dir_logged(&self.versions_dir(user_id, file_id)).await;
    }

    /// Best-effort removal of everything a user stored
    pub async fn remove_user_dir(&self, user_id: i64) {
        let uid = user_id.to_string();
        remove_dir_logged(&self.user_dir(user_id)).await;
        remove_dir_logged(&self.root.join(BLOBS_DIR).join(&uid)).await;
        remove_dir_logged(&self.root.join(VERSIONS_DIR).join(&uid)).await;
    }
}

async fn create_dir(dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create {}: {}", dir.display(), e)))
}

async fn remove_dir_logged(dir: &Path) {
    match fs::remove_dir_all(dir).await {
        Ok(()) => debug!(path = %dir.display(), "Removed directory"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %dir.display(), "Failed to remove directory: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let store = LocalStore::new("/srv/assets");
        assert_eq!(
            store.file_path(7, "notes.txt"),
            PathBuf::from("/srv/assets/7/notes.txt")
        );
        assert_eq!(
            store.version_path(7, 3, 2),
            PathBuf::from("/srv/assets/.versions/7/3/2")
        );

        let blob = store.new_blob_path(7);
        assert!(blob.starts_with("/srv/assets/.blobs/7"));
        assert_ne!(blob, store.new_blob_path(7));
    }

    #[tokio::test]
    async fn test_write_read_remove() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        let path = store.file_path(1, "a.txt");

        store.write(&path, b"hello").await.unwrap();
        assert_eq!(store.read(&path).await.unwrap().as_deref(), Some(&b"hello"[..]));
        let leftovers = std::fs::read_dir(dir.path().join(STAGING_DIR)).unwrap().count();
        assert_eq!(leftovers, 0);

        store.write(&path, b"again").await.unwrap();
        assert_eq!(store.read(&path).await.unwrap().as_deref(), Some(&b"again"[..]));

        store.remove(&path).await;
        assert!(store.read(&path).await.unwrap().is_none());
        // Removing twice is fine
        store.remove(&path).await;
    }

    #[tokio::test]
    async fn test_version_slot_survives_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        let current = store.file_path(1, "a.txt");
        let archived = store.version_path(1, 9, 1);

        store.write(&current, b"v1").await.unwrap();
        store.write(&archived, b"v1").await.unwrap();
        store.write(&current, b"v2").await.unwrap();

        assert_eq!(store.read(&archived).await.unwrap().as_deref(), Some(&b"v1"[..]));

        store.remove_versions(1, 9).await;
        assert!(!archived.exists());
    }

    #[tokio::test]
    async fn test_tmp_named_file_survives_sibling_write() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        let precious = store.file_path(1, "x.tmp");
        let sibling = store.file_path(1, "x");

        store.write(&precious, b"precious").await.unwrap();
        store.write(&sibling, b"other").await.unwrap();

        assert_eq!(store.read(&precious).await.unwrap().as_deref(), Some(&b"precious"[..]));
        assert_eq!(store.read(&sibling).await.unwrap().as_deref(), Some(&b"other"[..]));
    }

    #[tokio::test]
    async fn test_versions_named_upload_does_not_block_archiving() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        store
            .write(&store.file_path(1, ".versions"), b"user data")
            .await
            .unwrap();
        let archived = store.version_path(1, 7, 1);
        store.write(&archived, b"v1").await.unwrap();

        assert_eq!(store.read(&archived).await.unwrap().as_deref(), Some(&b"v1"[..]));
        assert_eq!(
            store.read(&store.file_path(1, ".versions")).await.unwrap().as_deref(),
            Some(&b"user data"[..])
        );
    }

    #[tokio::test]
    async fn test_remove_user_dir() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        store.ensure_user_dir(5).await.unwrap();
        store
            .write(&store.file_path(5, "x.bin"), &[0u8, 1, 2])
            .await
            .unwrap();
        let blob = store.new_blob_path(5);
        store.write(&blob, b"blob").await.unwrap();
        store.write(&store.version_path(5, 1, 1), b"old").await.unwrap();
        store.write(&store.new_blob_path(6), b"keep").await.unwrap();

        store.remove_user_dir(5).await;
        assert!(!store.user_dir(5).exists());
        assert!(!blob.exists());
        assert!(!dir.path().join(VERSIONS_DIR).join("5").exists());
        assert!(dir.path().join(BLOBS_DIR).join("6").exists());
    }
}
