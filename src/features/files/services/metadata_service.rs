use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::FileMetadataDto;
use crate::features::files::models::FileMetadata;
use crate::features::files::services::FileService;
use crate::shared::constants::MAX_METADATA_VALUE_LEN;
use crate::shared::validation::METADATA_KEY_REGEX;

/// Service for per-file key/value metadata
pub struct MetadataService {
    pool: PgPool,
    files: Arc<FileService>,
}

impl MetadataService {
    pub fn new(pool: PgPool, files: Arc<FileService>) -> Self {
        Self { pool, files }
    }

    async fn load(&self, file_id: i64) -> Result<BTreeMap<String, String>> {
        let rows = sqlx::query_as::<_, FileMetadata>(
            r#"
            SELECT id, file_id, key, value, created_at, updated_at
            FROM file_metadata
            WHERE file_id = $1
            ORDER BY key
            "#,
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load file metadata: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }

    pub async fn get(&self, user: &AuthenticatedUser, file_id: i64) -> Result<FileMetadataDto> {
        let file = self.files.get_owned(user, file_id).await?;
        Ok(FileMetadataDto {
            file_id: file.id,
            metadata: self.load(file.id).await?,
        })
    }

    /// Upsert every pair in one transaction
    pub async fn upsert(
        &self,
        user: &AuthenticatedUser,
        file_id: i64,
        entries: BTreeMap<String, String>,
    ) -> Result<FileMetadataDto> {
        validate_metadata(&entries)?;
        let file = self.files.get_owned(user, file_id).await?;

        let mut tx = self.pool.begin().await?;
        for (key, value) in &entries {
            sqlx::query(
                r#"
                INSERT INTO file_metadata (file_id, key, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (file_id, key)
                DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
                "#,
            )
            .bind(file.id)
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(file_id, keys = entries.len(), "File metadata updated");

        Ok(FileMetadataDto {
            file_id: file.id,
            metadata: self.load(file.id).await?,
        })
    }

    pub async fn delete(
        &self,
        user: &AuthenticatedUser,
        file_id: i64,
        key: &str,
    ) -> Result<FileMetadataDto> {
        let file = self.files.get_owned(user, file_id).await?;

        let removed = sqlx::query("DELETE FROM file_metadata WHERE file_id = $1 AND key = $2")
            .bind(file.id)
            .bind(key)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(AppError::NotFound(format!(
                "Metadata key '{}' not found",
                key
            )));
        }

        Ok(FileMetadataDto {
            file_id: file.id,
            metadata: self.load(file.id).await?,
        })
    }
}

pub fn validate_metadata(entries: &BTreeMap<String, String>) -> Result<()> {
    if entries.is_empty() {
        return Err(AppError::Validation(
            "At least one metadata entry is required".to_string(),
        ));
    }

    let errors: Vec<String> = entries
        .iter()
        .filter_map(|(key, value)| {
            if !METADATA_KEY_REGEX.is_match(key) {
                Some(format!(
                    "Invalid key '{}': use 1-64 letters, digits, '_', '.' or '-'",
                    key
                ))
            } else if value.chars().count() > MAX_METADATA_VALUE_LEN {
                Some(format!(
                    "Value for '{}' exceeds {} characters",
                    key, MAX_METADATA_VALUE_LEN
                ))
            } else {
                None
            }
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors.join("; ")))
    }
}
