use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::config::StorageBackend;
use crate::core::database::is_unique_violation;
use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    DeleteFileResponseDto, FileListDto, FileResponseDto, FileVersionDto, FileVersionsDto,
    UploadResponseDto,
};
use crate::features::files::models::{File, FileVersion};
use crate::modules::storage::LocalStore;
use crate::shared::constants::REFERENCE_METADATA_KEY;
use crate::shared::validation::sanitize_filename;

const FILE_COLUMNS: &str = "id, owner_id, filename, size, path, content_type, checksum, current_version, created_at, updated_at";

/// Bytes of a file or version ready to be sent to a client
#[derive(Debug, Clone)]
pub struct FileContent {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Bytes about to become a file's current content
struct NewContent<'a> {
    content_type: &'a str,
    checksum: String,
    data: Vec<u8>,
}

/// Service for file upload, retrieval, deletion and versioning
pub struct FileService {
    pool: PgPool,
    store: Arc<LocalStore>,
    backend: StorageBackend,
}

impl FileService {
    pub fn new(pool: PgPool, store: Arc<LocalStore>, backend: StorageBackend) -> Self {
        Self {
            pool,
            store,
            backend,
        }
    }

    /// Store an upload; a second upload under the same name archives the
    /// current content and becomes the next version
    pub async fn upload(
        &self,
        user: &AuthenticatedUser,
        raw_filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<UploadResponseDto> {
        let filename = sanitize_filename(raw_filename)
            .ok_or_else(|| AppError::BadRequest("Invalid filename".to_string()))?;

        let size = data.len() as i64;
        if size > user.max_upload_size {
            return Err(AppError::BadRequest("File too large".to_string()));
        }

        let content = NewContent {
            content_type,
            checksum: checksum_hex(&data),
            data,
        };
        let mut placed = Vec::new();
        let (file, replaced) = match self
            .store_upload(user.user_id, &filename, content, &mut placed)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                self.discard(&placed).await;
                return Err(e);
            }
        };
        self.release_replaced(replaced.as_ref(), &file).await;

        info!(
            file_id = file.id,
            user_id = user.user_id,
            version = file.current_version,
            size = file.size,
            "File stored"
        );

        Ok(file.into())
    }

    /// Runs the upload transaction. Every blob written to disk is pushed onto
    /// `placed` so the caller can remove them if the transaction fails.
    /// Returns the stored row and the row it replaced, if any.
    async fn store_upload(
        &self,
        owner_id: i64,
        filename: &str,
        content: NewContent<'_>,
        placed: &mut Vec<PathBuf>,
    ) -> Result<(File, Option<File>)> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, File>(&format!(
            "SELECT {} FROM files WHERE owner_id = $1 AND filename = $2 FOR UPDATE",
            FILE_COLUMNS
        ))
        .bind(owner_id)
        .bind(filename)
        .fetch_optional(&mut *tx)
        .await?;

        let file = match &existing {
            Some(current) => {
                self.archive_current(&mut tx, current, placed).await?;
                self.replace_content(&mut tx, current, content, placed).await?
            }
            None => self.insert_new(&mut tx, owner_id, filename, content, placed).await?,
        };

        tx.commit().await?;
        Ok((file, existing))
    }

    async fn discard(&self, placed: &[PathBuf]) {
        for path in placed {
            self.store.remove(path).await;
        }
    }

    /// After a commit the replaced content lives on as an archived version,
    /// so its old blob can go
    async fn release_replaced(&self, replaced: Option<&File>, file: &File) {
        if let Some(old) = replaced.and_then(|f| f.path.as_deref()) {
            if file.path.as_deref() != Some(old) {
                self.store.remove(&PathBuf::from(old)).await;
            }
        }
    }

    async fn insert_new(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: i64,
        filename: &str,
        new: NewContent<'_>,
        placed: &mut Vec<PathBuf>,
    ) -> Result<File> {
        let size = new.data.len() as i64;
        let (content, path) = self.place_bytes(owner_id, new.data, placed).await?;

        sqlx::query_as::<_, File>(&format!(
            r#"
            INSERT INTO files (owner_id, filename, size, content, path, content_type, checksum)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(owner_id)
        .bind(filename)
        .bind(size)
        .bind(content)
        .bind(path)
        .bind(new.content_type)
        .bind(&new.checksum)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "A concurrent upload of '{}' is in progress, retry",
                    filename
                ))
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn replace_content(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        current: &File,
        new: NewContent<'_>,
        placed: &mut Vec<PathBuf>,
    ) -> Result<File> {
        let size = new.data.len() as i64;
        let (content, path) = self.place_bytes(current.owner_id, new.data, placed).await?;

        let file = sqlx::query_as::<_, File>(&format!(
            r#"
            UPDATE files
            SET size = $2, content = $3, path = $4, content_type = $5, checksum = $6,
                current_version = current_version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(current.id)
        .bind(size)
        .bind(content)
        .bind(path)
        .bind(new.content_type)
        .bind(&new.checksum)
        .fetch_one(&mut **tx)
        .await?;

        Ok(file)
    }

    /// Write bytes according to the backend; returns the `(content, path)`
    /// column values. Disk writes go to a fresh blob, never over live content.
    async fn place_bytes(
        &self,
        owner_id: i64,
        data: Vec<u8>,
        placed: &mut Vec<PathBuf>,
    ) -> Result<(Option<Vec<u8>>, Option<String>)> {
        match self.backend {
            StorageBackend::Database => Ok((Some(data), None)),
            StorageBackend::Disk => {
                let path = self.store.new_blob_path(owner_id);
                self.store.write(&path, &data).await?;
                let stored = path.to_string_lossy().into_owned();
                placed.push(path);
                Ok((None, Some(stored)))
            }
        }
    }

    /// Copy the current content into `file_versions` as `current_version`
    async fn archive_current(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        file: &File,
        placed: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let archived_path = match self.backend {
            StorageBackend::Database => None,
            StorageBackend::Disk => {
                let target = self
                    .store
                    .version_path(file.owner_id, file.id, file.current_version);
                match self.read_current(tx, file).await? {
                    Some(bytes) => {
                        self.store.write(&target, &bytes).await?;
                        let stored = target.to_string_lossy().into_owned();
                        placed.push(target);
                        Some(stored)
                    }
                    None => {
                        warn!(file_id = file.id, "Current content missing, archiving metadata only");
                        None
                    }
                }
            }
        };

        // On the disk backend the archived bytes are on disk, not in the row
        sqlx::query(
            r#"
            INSERT INTO file_versions (file_id, version_number, size, content, path, content_type, checksum)
            SELECT id, current_version, size,
                   CASE WHEN $2::TEXT IS NULL THEN content ELSE NULL END,
                   $2, content_type, checksum
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(file.id)
        .bind(archived_path)
        .execute(&mut **tx)
        .await?;

        debug!(file_id = file.id, version = file.current_version, "Archived version");
        Ok(())
    }

    async fn read_current(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        file: &File,
    ) -> Result<Option<Vec<u8>>> {
        let content: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT content FROM files WHERE id = $1")
                .bind(file.id)
                .fetch_one(&mut **tx)
                .await?;
        if content.is_some() {
            return Ok(content);
        }
        self.read_from_disk(file.owner_id, &file.filename, file.path.as_deref())
            .await
    }

    /// Read the stored path, falling back to the conventional per-user path
    async fn read_from_disk(
        &self,
        owner_id: i64,
        filename: &str,
        stored_path: Option<&str>,
    ) -> Result<Option<Vec<u8>>> {
        if let Some(stored) = stored_path {
            if let Some(bytes) = self.store.read(&PathBuf::from(stored)).await? {
                return Ok(Some(bytes));
            }
            debug!(path = stored, "Stored path missing, trying default location");
        }
        self.store
            .read(&self.store.file_path(owner_id, filename))
            .await
    }

    /// Fetch a file the caller owns: 404 when missing, 403 when not theirs
    pub async fn get_owned(&self, user: &AuthenticatedUser, file_id: i64) -> Result<File> {
        let file = sqlx::query_as::<_, File>(&format!(
            "SELECT {} FROM files WHERE id = $1",
            FILE_COLUMNS
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if file.owner_id != user.user_id {
            return Err(AppError::Forbidden(
                "You do not have permission to access this file".to_string(),
            ));
        }
        Ok(file)
    }

    pub async fn list(&self, user: &AuthenticatedUser) -> Result<FileListDto> {
        let files = sqlx::query_as::<_, File>(&format!(
            "SELECT {} FROM files WHERE owner_id = $1 ORDER BY filename",
            FILE_COLUMNS
        ))
        .bind(user.user_id)
        .fetch_all(&self.pool)
        .await?;

        let files: Vec<FileResponseDto> = files.into_iter().map(Into::into).collect();
        Ok(FileListDto {
            count: files.len(),
            files,
        })
    }

    pub async fn download(&self, user: &AuthenticatedUser, file_id: i64) -> Result<FileContent> {
        let file = self.get_owned(user, file_id).await?;
        let bytes = self.current_bytes(&file).await?.ok_or_else(|| {
            warn!(file_id, "File row exists but its bytes are gone");
            AppError::NotFound("File not found on server".to_string())
        })?;

        Ok(FileContent {
            filename: file.filename,
            bytes,
        })
    }

    async fn current_bytes(&self, file: &File) -> Result<Option<Vec<u8>>> {
        let content: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT content FROM files WHERE id = $1")
                .bind(file.id)
                .fetch_one(&self.pool)
                .await?;
        if content.is_some() {
            return Ok(content);
        }
        self.read_from_disk(file.owner_id, &file.filename, file.path.as_deref())
            .await
    }

    /// Delete a file, its versions and metadata. Disk cleanup is best-effort.
    pub async fn delete(
        &self,
        user: &AuthenticatedUser,
        file_id: i64,
    ) -> Result<DeleteFileResponseDto> {
        let file = self.get_owned(user, file_id).await?;

        if let Some(stored) = file.path.as_deref() {
            self.store.remove(&PathBuf::from(stored)).await;
        }
        self.store
            .remove(&self.store.file_path(file.owner_id, &file.filename))
            .await;
        self.store.remove_versions(file.owner_id, file.id).await;

        sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file.id)
            .execute(&self.pool)
            .await?;

        info!(file_id, user_id = user.user_id, "File deleted");

        Ok(DeleteFileResponseDto {
            message: format!("File '{}' deleted successfully", file.filename),
            file_id,
        })
    }

    pub async fn versions(&self, user: &AuthenticatedUser, file_id: i64) -> Result<FileVersionsDto> {
        let file = self.get_owned(user, file_id).await?;

        let versions = sqlx::query_as::<_, FileVersion>(
            r#"
            SELECT id, file_id, version_number, size, path, content_type, checksum, created_at
            FROM file_versions
            WHERE file_id = $1
            ORDER BY version_number DESC
            "#,
        )
        .bind(file.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(FileVersionsDto {
            file_id: file.id,
            filename: file.filename,
            current_version: file.current_version,
            versions: versions.into_iter().map(FileVersionDto::from).collect(),
        })
    }

    async fn version_bytes(
        &self,
        executor: &mut sqlx::PgConnection,
        file: &File,
        version_number: i32,
    ) -> Result<(FileVersion, Vec<u8>)> {
        let version = sqlx::query_as::<_, FileVersion>(
            r#"
            SELECT id, file_id, version_number, size, path, content_type, checksum, created_at
            FROM file_versions
            WHERE file_id = $1 AND version_number = $2
            "#,
        )
        .bind(file.id)
        .bind(version_number)
        .fetch_optional(&mut *executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Version {} not found", version_number)))?;

        let content: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT content FROM file_versions WHERE id = $1")
                .bind(version.id)
                .fetch_one(&mut *executor)
                .await?;

        let bytes = match content {
            Some(bytes) => Some(bytes),
            None => match version.path.as_deref() {
                Some(path) => self.store.read(&PathBuf::from(path)).await?,
                None => None,
            },
        }
        .ok_or_else(|| AppError::NotFound("File not found on server".to_string()))?;

        Ok((version, bytes))
    }

    pub async fn download_version(
        &self,
        user: &AuthenticatedUser,
        file_id: i64,
        version_number: i32,
    ) -> Result<FileContent> {
        let file = self.get_owned(user, file_id).await?;
        let mut conn = self.pool.acquire().await?;
        let (version, bytes) = self.version_bytes(&mut conn, &file, version_number).await?;

        Ok(FileContent {
            filename: versioned_filename(&file.filename, version.version_number),
            bytes,
        })
    }

    /// Make an archived version current again as a new version number
    pub async fn restore_version(
        &self,
        user: &AuthenticatedUser,
        file_id: i64,
        version_number: i32,
    ) -> Result<UploadResponseDto> {
        self.get_owned(user, file_id).await?;

        let mut placed = Vec::new();
        let (file, replaced) = match self
            .store_restore(file_id, version_number, &mut placed)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                self.discard(&placed).await;
                return Err(e);
            }
        };
        self.release_replaced(Some(&replaced), &file).await;

        info!(
            file_id,
            restored_from = version_number,
            version = file.current_version,
            "File version restored"
        );

        Ok(file.into())
    }

    async fn store_restore(
        &self,
        file_id: i64,
        version_number: i32,
        placed: &mut Vec<PathBuf>,
    ) -> Result<(File, File)> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, File>(&format!(
            "SELECT {} FROM files WHERE id = $1 FOR UPDATE",
            FILE_COLUMNS
        ))
        .bind(file_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        let (version, bytes) = self.version_bytes(&mut tx, &current, version_number).await?;

        self.archive_current(&mut tx, &current, placed).await?;
        let restored = NewContent {
            content_type: &version.content_type,
            checksum: version.checksum.clone(),
            data: bytes,
        };
        let file = self.replace_content(&mut tx, &current, restored, placed).await?;

        tx.commit().await?;
        Ok((file, current))
    }

    /// Files the user tagged as reference documents, with their bytes
    pub async fn reference_files(&self, user_id: i64) -> Result<Vec<FileContent>> {
        let files = sqlx::query_as::<_, File>(
            r#"
            SELECT f.id, f.owner_id, f.filename, f.size, f.path, f.content_type, f.checksum,
                   f.current_version, f.created_at, f.updated_at
            FROM files f
            JOIN file_metadata m ON m.file_id = f.id
            WHERE f.owner_id = $1 AND m.key = $2 AND LOWER(m.value) = 'true'
            ORDER BY f.filename
            "#,
        )
        .bind(user_id)
        .bind(REFERENCE_METADATA_KEY)
        .fetch_all(&self.pool)
        .await?;

        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            match self.current_bytes(&file).await? {
                Some(bytes) => documents.push(FileContent {
                    filename: file.filename,
                    bytes,
                }),
                None => warn!(file_id = file.id, "Reference file has no stored bytes"),
            }
        }
        Ok(documents)
    }
}

pub fn checksum_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// `report.pdf` version 2 downloads as `report.v2.pdf`
pub fn versioned_filename(filename: &str, version: i32) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}.v{}.{}", stem, version, ext),
        _ => format!("{}.v{}", filename, version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{create_test_user, lazy_pool};
    use tempfile::TempDir;

    #[test]
    fn test_checksum_hex() {
        assert_eq!(
            checksum_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_versioned_filename() {
        assert_eq!(versioned_filename("report.pdf", 2), "report.v2.pdf");
        assert_eq!(versioned_filename("archive.tar.gz", 1), "archive.tar.v1.gz");
        assert_eq!(versioned_filename("Makefile", 3), "Makefile.v3");
        assert_eq!(versioned_filename(".env", 4), ".env.v4");
    }

    #[tokio::test]
    async fn test_upload_rejects_before_touching_storage() {
        let dir = TempDir::new().unwrap();
        let service = FileService::new(
            lazy_pool(),
            Arc::new(LocalStore::new(dir.path())),
            StorageBackend::Disk,
        );
        let mut user = create_test_user();
        user.max_upload_size = 4;

        let err = service
            .upload(&user, "big.bin", "application/octet-stream", vec![0; 5])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "File too large"));

        let err = service
            .upload(&user, "../..", "text/plain", vec![1])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert!(!dir.path().join("1").exists());
        assert!(!dir.path().join(".blobs").exists());
    }

    #[tokio::test]
    async fn test_concurrent_placements_do_not_clobber_each_other() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let service = FileService::new(lazy_pool(), Arc::clone(&store), StorageBackend::Disk);

        let mut winner = Vec::new();
        let mut loser = Vec::new();
        let (_, winner_path) = service
            .place_bytes(1, b"winner".to_vec(), &mut winner)
            .await
            .unwrap();
        let (content, loser_path) = service
            .place_bytes(1, b"loser".to_vec(), &mut loser)
            .await
            .unwrap();
        assert!(content.is_none());
        assert_ne!(winner_path, loser_path);

        // The losing transaction rolls back and drops only its own blob
        service.discard(&loser).await;

        let winner_path = PathBuf::from(winner_path.unwrap());
        assert_eq!(
            store.read(&winner_path).await.unwrap().as_deref(),
            Some(&b"winner"[..])
        );
        assert!(!PathBuf::from(loser_path.unwrap()).exists());
        assert!(!store.file_path(1, "notes.txt").exists());
    }

    #[tokio::test]
    async fn test_database_backend_places_nothing_on_disk() {
        let dir = TempDir::new().unwrap();
        let service = FileService::new(
            lazy_pool(),
            Arc::new(LocalStore::new(dir.path())),
            StorageBackend::Database,
        );

        let mut placed = Vec::new();
        let (content, path) = service
            .place_bytes(1, b"inline".to_vec(), &mut placed)
            .await
            .unwrap();
        assert_eq!(content.as_deref(), Some(&b"inline"[..]));
        assert!(path.is_none());
        assert!(placed.is_empty());
    }
}
